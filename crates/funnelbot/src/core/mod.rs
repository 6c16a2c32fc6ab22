//! Process-level plumbing: configuration, logging, errors, metrics and HTTP routes

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod web_server;

pub use error::{AppError, AppResult};
