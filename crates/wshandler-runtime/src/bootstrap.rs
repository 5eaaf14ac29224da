//! One-call setup: configuration, logging, registry.
//!
//! ```rust,ignore
//! use wshandler_runtime::bootstrap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = bootstrap().await?;
//!     registry.handle(("ping", "request"), &ping, None).await;
//!     registry.check().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;
use wshandler_core::{Registry, TracingLogger};

use crate::config::{ConfigLoader, HubConfig, validate_config};
use crate::error::BootstrapResult;
use crate::logging::init_from_config;

/// Loads configuration from the default locations, installs the subscriber
/// and returns a registry built from the `dispatch` section.
pub async fn bootstrap() -> BootstrapResult<Arc<Registry>> {
    bootstrap_with(ConfigLoader::new()).await
}

/// Like [`bootstrap`], with a caller-prepared loader.
pub async fn bootstrap_with(loader: ConfigLoader) -> BootstrapResult<Arc<Registry>> {
    let config = loader.load()?;
    validate_config(&config)?;
    init_from_config(&config.logging);

    let registry = registry_from_config(&config).await?;
    info!(
        step_timeout_ms = config.dispatch.step_timeout_ms,
        step_budget = ?config.dispatch.step_budget,
        "wshandler registry ready"
    );
    Ok(Arc::new(registry))
}

/// Builds a registry from an already loaded configuration without touching
/// the global subscriber.
pub async fn registry_from_config(config: &HubConfig) -> BootstrapResult<Registry> {
    let registry = Registry::with_config(TracingLogger, config.dispatch.clone());
    registry.check().await?;
    Ok(registry)
}
