//! Configuration module for the wshandler runtime.
//!
//! This module provides layered configuration loading (defaults, TOML files,
//! environment variables) and validation for the dispatch registry and the
//! logging subscriber.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{HubConfig, LogFormat, LogOutput, LoggingConfig, SpanEventConfig};
pub use validation::validate_config;
