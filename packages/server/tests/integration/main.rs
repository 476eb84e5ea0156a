mod common;
mod entries;
mod health;
