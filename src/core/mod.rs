//! Core infrastructure: configuration, errors, logging, state, server.

pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
pub use state::ServerState;
