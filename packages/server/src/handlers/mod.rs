pub mod entry;
pub mod health;
pub mod photo;
