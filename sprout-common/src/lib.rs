//! # Sprout Common Library
//!
//! Shared code for Sprout services:
//! - Error type used by configuration loading
//! - TOML bootstrap config resolution and atomic write-back
//! - Logging configuration and `tracing` initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::LoggingConfig;
