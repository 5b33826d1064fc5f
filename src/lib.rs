pub mod api;
pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod logging;
