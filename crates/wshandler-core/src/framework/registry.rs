//! Handler registry.
//!
//! The [`Registry`] maps [`HandlerKey`]s to handlers and keeps the pipeline
//! chains that link handlers together. Registration is chainable and defers
//! errors:
//!
//! ```rust,ignore
//! use wshandler_core::{Handler, HandlerKey, Registry, TracingLogger};
//!
//! let auth = Handler::new(authenticate);
//! let load = Handler::new(load_profile);
//!
//! let registry = Registry::new(TracingLogger);
//! registry
//!     .set_log_level("debug").await
//!     .handle(("login", "request"), &auth, None).await
//!     .handle(("login", "profile"), &load, Some(&auth)).await;
//!
//! registry.check().await?;
//! ```
//!
//! The first failing call sets a sticky error. Every later configuration call
//! becomes a no-op until the error is read with [`Registry::error`] or
//! [`Registry::check`]. [`Registry::try_handle`] reports each registration's
//! outcome directly instead.
//!
//! # Locking
//!
//! Registration takes the state lock exclusively. Dispatch holds it shared for
//! the whole call, so concurrent dispatches never wait on each other while a
//! registration waits for in-flight dispatches to finish, and vice versa.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;

use crate::config::DispatchConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::foundation::level::Level;
use crate::foundation::payload::HandlerKey;
use crate::framework::chain::ChainIndex;
use crate::framework::gate::Gate;
use crate::framework::handler::{Handler, HandlerId};
use crate::logging::{LogSink, Logger, TracingLogger};

const ORIGIN: &str = "registry";

/// Mutable registry state, guarded by one lock.
#[derive(Debug, Default)]
pub(crate) struct RegistryState {
    /// Key to handler entry.
    pub(crate) routes: HashMap<HandlerKey, Handler>,
    /// Pipeline links between handlers.
    pub(crate) chains: ChainIndex,
    /// First configuration failure, if any.
    pub(crate) error: Option<RegistryError>,
}

/// Registry of event handlers with single-shot and pipelined dispatch.
///
/// `Registry` is `Send + Sync`; share it behind an [`Arc`] to dispatch from
/// many tasks.
pub struct Registry {
    pub(crate) state: RwLock<RegistryState>,
    pub(crate) sink: LogSink,
    pub(crate) gate: Gate,
    pub(crate) config: DispatchConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(TracingLogger)
    }
}

impl Registry {
    /// Creates a registry with default settings.
    pub fn new(logger: impl Logger + 'static) -> Self {
        Self::with_config(logger, DispatchConfig::default())
    }

    /// Creates a registry from `config`.
    ///
    /// An unparsable `config.log_level` leaves the threshold at `info` and
    /// sets the sticky error.
    pub fn with_config(logger: impl Logger + 'static, config: DispatchConfig) -> Self {
        let mut state = RegistryState::default();
        let threshold = match Level::parse(&config.log_level) {
            Ok(level) => level,
            Err(err) => {
                state.error = Some(err.into());
                Level::default()
            }
        };

        let registry = Self {
            state: RwLock::new(state),
            sink: LogSink::new(Arc::new(logger), threshold),
            gate: Gate::new(config.grace_period()),
            config,
        };
        registry
            .sink
            .log(Level::Info, ORIGIN, "new handler registry created", Vec::new);
        registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The current log threshold.
    pub fn log_level(&self) -> Level {
        self.sink.threshold()
    }

    /// Changes the log threshold. Chainable; failures are deferred.
    pub async fn set_log_level(&self, level: &str) -> &Self {
        let mut state = self.state.write().await;
        if state.error.is_some() {
            return self;
        }

        match Level::parse(level) {
            Ok(parsed) => {
                self.sink.set_threshold(parsed);
                self.sink.log(
                    Level::Info,
                    ORIGIN,
                    format_args!("change log level to {level}"),
                    Vec::new,
                );
            }
            Err(err) => self.fail(&mut state, err.into()),
        }
        self
    }

    /// Registers `handler` under `key`, optionally after `parent` in a
    /// pipeline. Chainable; failures are deferred.
    pub async fn handle(
        &self,
        key: impl Into<HandlerKey>,
        handler: &Handler,
        parent: Option<&Handler>,
    ) -> &Self {
        let mut state = self.state.write().await;
        if state.error.is_some() {
            return self;
        }

        if let Err(err) = self.register(&mut state, key.into(), handler, parent) {
            self.fail(&mut state, err);
        }
        self
    }

    /// Registers `handler` and reports the outcome directly.
    ///
    /// Unlike [`handle`](Self::handle), this neither consults nor sets the
    /// sticky error.
    pub async fn try_handle(
        &self,
        key: impl Into<HandlerKey>,
        handler: &Handler,
        parent: Option<&Handler>,
    ) -> RegistryResult<HandlerId> {
        let mut state = self.state.write().await;
        self.register(&mut state, key.into(), handler, parent)
    }

    /// The sticky configuration error, if any.
    pub async fn error(&self) -> Option<RegistryError> {
        self.state.read().await.error.clone()
    }

    /// `Err` with the sticky configuration error, if any.
    pub async fn check(&self) -> RegistryResult<()> {
        match self.error().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Whether a handler is registered under `key`.
    pub async fn contains(&self, key: &HandlerKey) -> bool {
        self.state.read().await.routes.contains_key(key)
    }

    /// Number of registered keys.
    pub async fn len(&self) -> usize {
        self.state.read().await.routes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of pipeline steps a [`call_pipeline`](Self::call_pipeline) on
    /// `key` would run.
    pub async fn chain_len(&self, key: &HandlerKey) -> Option<usize> {
        let state = self.state.read().await;
        let handler = state.routes.get(key)?;
        Some(state.chains.len_from(handler.id()))
    }

    fn register(
        &self,
        state: &mut RegistryState,
        key: HandlerKey,
        handler: &Handler,
        parent: Option<&Handler>,
    ) -> RegistryResult<HandlerId> {
        if state.routes.contains_key(&key) {
            return Err(RegistryError::KeyRegistered { key });
        }

        let link = state.chains.plan(handler, parent)?;
        let id = state.chains.apply(link);

        self.sink.log(
            Level::Debug,
            ORIGIN,
            format_args!("handler registered:{key}:{}", handler.name()),
            || {
                vec![json!({
                    "handler": id,
                    "parent": parent.map(Handler::id),
                    "root": state.chains.root_of(id),
                })]
            },
        );
        state.routes.insert(key, handler.clone());
        Ok(id)
    }

    fn fail(&self, state: &mut RegistryState, err: RegistryError) {
        self.sink
            .log(Level::Error, ORIGIN, format_args!("{err}"), Vec::new);
        state.error = Some(err);
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("config", &self.config)
            .field("log_level", &self.log_level())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use crate::foundation::context::CallContext;
    use crate::foundation::payload::CallData;
    use crate::logging::CollectingLogger;

    async fn step(_ctx: CallContext, data: CallData) -> HandlerResult {
        Ok(data)
    }

    fn key(event: &str) -> HandlerKey {
        HandlerKey::new(event, "ok")
    }

    #[tokio::test]
    async fn test_chained_registration() {
        let (a, b) = (Handler::new(step), Handler::new(step));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await;

        assert!(registry.check().await.is_ok());
        assert_eq!(registry.len().await, 2);
        assert_eq!(registry.chain_len(&key("a")).await, Some(2));
        assert_eq!(registry.chain_len(&key("b")).await, Some(1));
        assert_eq!(registry.chain_len(&key("missing")).await, None);
    }

    #[tokio::test]
    async fn test_duplicate_key_is_sticky() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("a"), &b, None)
            .await
            .handle(key("c"), &c, None)
            .await;

        assert_eq!(
            registry.error().await,
            Some(RegistryError::KeyRegistered { key: key("a") })
        );
        assert_eq!(registry.len().await, 1);
        assert!(!registry.contains(&key("c")).await);

        // The rejected handler got no stage, so it can still start a chain
        // through the direct API.
        assert!(registry.try_handle(key("b"), &b, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_link_leaves_chain_intact() {
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await
            .handle(key("c"), &c, Some(&a))
            .await;

        assert!(matches!(
            registry.error().await,
            Some(RegistryError::ParentHasChild { .. })
        ));
        assert_eq!(registry.chain_len(&key("a")).await, Some(2));
        assert!(!registry.contains(&key("c")).await);
    }

    #[tokio::test]
    async fn test_try_handle_reports_each_failure() {
        let (a, b) = (Handler::new(step), Handler::new(step));
        let registry = Registry::default();

        let err = registry
            .try_handle(key("b"), &b, Some(&a))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::ParentNotRegistered { .. }));
        assert!(registry.error().await.is_none());

        assert_eq!(registry.try_handle(key("a"), &a, None).await, Ok(a.id()));
        assert_eq!(registry.try_handle(key("b"), &b, Some(&a)).await, Ok(b.id()));
    }

    #[tokio::test]
    async fn test_set_log_level() {
        let logger = Arc::new(CollectingLogger::new());
        let registry = Registry::new(logger.clone());
        assert_eq!(registry.log_level(), Level::Info);

        registry.set_log_level("DEBUG").await;
        assert_eq!(registry.log_level(), Level::Debug);
        assert!(
            logger
                .records()
                .iter()
                .any(|r| r.event == "change log level to DEBUG")
        );

        registry.set_log_level("bogus").await.set_log_level("trace").await;
        assert_eq!(registry.log_level(), Level::Debug);
        assert!(matches!(
            registry.check().await,
            Err(RegistryError::InvalidLogLevel(_))
        ));
    }

    #[tokio::test]
    async fn test_sticky_error_blocks_registration() {
        let a = Handler::new(step);
        let registry = Registry::default();
        registry
            .set_log_level("loud")
            .await
            .handle(key("a"), &a, None)
            .await;

        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_configured_level_is_sticky() {
        let config = DispatchConfig {
            log_level: "shouting".into(),
            ..Default::default()
        };
        let registry = Registry::with_config(TracingLogger, config);
        assert_eq!(registry.log_level(), Level::Info);
        assert!(matches!(
            registry.error().await,
            Some(RegistryError::InvalidLogLevel(_))
        ));
    }

    #[tokio::test]
    async fn test_creation_and_failures_are_logged() {
        let logger = Arc::new(CollectingLogger::new());
        let a = Handler::new(step);
        let registry = Registry::new(logger.clone());
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("a"), &a, None)
            .await;

        let records = logger.records();
        assert_eq!(records[0].event, "new handler registry created");
        assert_eq!(records[0].level, Level::Info);
        let errors = logger.at(Level::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].origin, "registry");
    }

    #[tokio::test]
    async fn test_registration_record_names_the_chain_root() {
        let logger = Arc::new(CollectingLogger::new());
        let (a, b, c) = (Handler::new(step), Handler::new(step), Handler::new(step));
        let registry = Registry::new(logger.clone());
        registry.set_log_level("debug").await;
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await
            .handle(key("c"), &c, Some(&b))
            .await;

        let registered: Vec<_> = logger
            .at(Level::Debug)
            .into_iter()
            .filter(|r| r.event.starts_with("handler registered:"))
            .collect();
        assert_eq!(registered.len(), 3);
        assert_eq!(registered[2].body[0]["root"], json!(a.id()));
        assert_eq!(registered[2].body[0]["parent"], json!(b.id()));
    }
}
