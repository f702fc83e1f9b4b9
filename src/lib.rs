pub mod config;
pub mod server;
pub mod services;
