//! # wshandler Core
//!
//! An in-process registry that dispatches decoded messages to handler
//! functions.
//!
//! Handlers are registered under a [`HandlerKey`] (an event name plus a status
//! tag) and invoked either once or as a pipeline: a linear chain of handlers
//! where each step's output is the next step's input and every intermediate
//! payload is streamed to a consumer channel.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Data model shared by every component:
//! - **Severity**: ordered log levels and their parsing ([`Level`])
//! - **Payloads**: keys and call data ([`HandlerKey`], [`MessagePayload`], [`CallData`])
//! - **Context**: cancellation and deadlines ([`CallContext`])
//!
//! ### Framework Layer
//!
//! Registration and dispatch:
//! - **Handlers**: the handler signature and identity ([`CallHandler`], [`Handler`])
//! - **Chains**: pipeline links between handlers ([`ChainIndex`])
//! - **Gate**: grace period and timeout handling around each call ([`Gate`])
//! - **Registry**: registration, `call` and `call_pipeline` ([`Registry`])
//!
//! ## Flow
//!
//! ```text
//!                 ┌──────────┐     ┌──────┐     ┌─────────┐
//! call ──────────▶│ Registry │────▶│ Gate │────▶│ Handler │──▶ CallData
//!                 └──────────┘     └──────┘     └─────────┘
//!                      │
//! call_pipeline ───────┘  step 1 ──▶ step 2 ──▶ step 3
//!                           │          │          │
//!                           ▼          ▼          ▼
//!                          ─────── output channel ───────▶
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use tokio::sync::mpsc;
//! use wshandler_core::prelude::*;
//!
//! async fn greet(_ctx: CallContext, data: CallData) -> HandlerResult {
//!     let reply = MessagePayload::new("greet").with_data("hello").with_status("ok");
//!     Ok(data.reply(reply))
//! }
//!
//! async fn audit(_ctx: CallContext, data: CallData) -> HandlerResult {
//!     Ok(data)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let greet = Handler::new(greet);
//!     let audit = Handler::new(audit);
//!
//!     let registry = Registry::default();
//!     registry
//!         .handle(("greet", "request"), &greet, None).await
//!         .handle(("greet", "audit"), &audit, Some(&greet)).await;
//!     registry.check().await?;
//!
//!     let key = HandlerKey::new("greet", "request");
//!     let (tx, mut rx) = mpsc::channel(4);
//!     registry
//!         .call_pipeline(CallContext::background(), &key, CallData::default(), &tx)
//!         .await?;
//!     drop(tx);
//!
//!     while let Some(payload) = rx.recv().await {
//!         println!("{payload:?}");
//!     }
//!     Ok(())
//! }
//! ```

// Architectural layers
pub mod foundation;
pub mod framework;

pub mod config;
pub mod error;
pub mod logging;

// Re-export foundation types
pub use foundation::{
    CANCELLED_MARKER, CallContext, CallData, ClientHandle, HandlerKey, Level, MessagePayload,
    STATUS_ERROR, TIMEOUT_MARKER,
};

// Re-export framework types
pub use framework::{
    CallHandler, ChainIndex, Gate, Handler, HandlerId, Link, Registry, Stage, Walk,
};

pub use config::{DispatchConfig, StepBudget};
pub use error::{
    BoxError, ContextError, DispatchError, DispatchResult, HandlerError, HandlerResult,
    ParseLevelError, RegistryError, RegistryResult,
};
pub use logging::{BoxedLogger, CollectingLogger, LogRecord, LogSink, Logger, TracingLogger};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{CallHandler, Handler, HandlerId, Registry};
    pub use super::{
        DispatchConfig, DispatchError, HandlerError, HandlerResult, Logger, RegistryError,
        StepBudget, TracingLogger,
    };
}
