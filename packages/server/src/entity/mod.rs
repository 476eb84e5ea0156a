pub mod entry;
pub mod photo;
