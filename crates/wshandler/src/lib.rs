//! # wshandler
//!
//! An in-process registry that routes decoded messages to async handlers,
//! either once or through a chain of pipeline steps.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐     ┌──────────┐     ┌──────┐     ┌──────────────────────┐
//! │  Runtime  │────▶│ Registry │────▶│ Gate │────▶│ Handler / pipeline   │──▶ channel
//! │ (config,  │     │ (key ─▶  │     │      │     │ step 1 ▶ 2 ▶ 3       │
//! │  logging) │     │ handler) │     └──────┘     └──────────────────────┘
//! └───────────┘     └──────────┘
//! ```
//!
//! - **Runtime**: loads configuration and installs the `tracing` subscriber
//! - **Registry**: maps `(event, status)` keys to handlers and links pipelines
//! - **Gate**: applies the grace period and turns timeouts into error payloads
//! - **Handlers**: user-defined async functions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wshandler::prelude::*;
//!
//! async fn ping(_ctx: CallContext, data: CallData) -> HandlerResult {
//!     Ok(data.reply(MessagePayload::new("pong").with_status("ok")))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = bootstrap().await?;
//!     registry.handle(("ping", "request"), &Handler::new(ping), None).await;
//!     registry.check().await?;
//!
//!     let key = HandlerKey::new("ping", "request");
//!     let reply = registry
//!         .call(CallContext::background(), &key, CallData::default())
//!         .await?;
//!     println!("{:?}", reply.payload);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `wshandler.toml` files (default)
//! - `json-log`: enable the JSON log format

pub use wshandler_core as core;
pub use wshandler_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use wshandler::prelude::*;
/// ```
pub mod prelude {
    // Registry and handlers
    pub use wshandler_core::prelude::*;

    // Logging collaborator
    pub use wshandler_core::{CollectingLogger, LogRecord};

    // Runtime entry points
    pub use wshandler_runtime::{
        BootstrapError, ConfigLoader, HubConfig, LoggingConfig, bootstrap, bootstrap_with,
    };
}
