//! wshandler Runtime - configuration and logging for the handler registry.
//!
//! This crate provides:
//! - Layered configuration loading with figment ([`ConfigLoader`])
//! - Configuration validation ([`validate_config`])
//! - Global `tracing` subscriber setup ([`LoggingBuilder`])
//! - A bootstrap entry point returning a ready [`Registry`](wshandler_core::Registry)
//!
//! ```ignore
//! use wshandler_runtime::{ConfigLoader, bootstrap_with};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = bootstrap_with(ConfigLoader::new().profile("production")).await?;
//!     // register handlers, then dispatch
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use bootstrap::{bootstrap, bootstrap_with, registry_from_config};
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, HubConfig, LogFormat, LogOutput, LoggingConfig,
    Profile, SpanEventConfig, load_config, load_config_from_file, validate_config,
};
pub use error::{BootstrapError, BootstrapResult};
pub use logging::{LoggingBuilder, init_from_config};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides the commonly used logging macros together with the
/// bootstrap entry points.
pub mod prelude {
    pub use super::{ConfigLoader, HubConfig, bootstrap, bootstrap_with};
    pub use tracing::{debug, error, info, instrument, span, trace, warn};
}
