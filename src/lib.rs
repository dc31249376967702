pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod server;
pub mod shutdown;
pub mod telemetry;

pub use error::{DemoError, Result};
