pub mod command;
pub mod config;
pub mod csrf;
pub mod error;
pub mod forms;
pub mod identity;
pub mod server;
