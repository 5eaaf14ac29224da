//! Runtime error types.

use thiserror::Error;
use wshandler_core::RegistryError;

use crate::config::ConfigError;

/// Errors that can occur while bootstrapping a registry.
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The registry rejected its configuration.
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Result type for bootstrap operations.
pub type BootstrapResult<T> = Result<T, BootstrapError>;
