pub mod art;
pub mod config;
pub mod core;
pub mod menu;
