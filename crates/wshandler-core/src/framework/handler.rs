//! Handler abstraction.
//!
//! Any async function taking a [`CallContext`] and a [`CallData`] and
//! returning a [`HandlerResult`] is a handler:
//!
//! ```rust,ignore
//! use wshandler_core::{CallContext, CallData, Handler, HandlerResult};
//!
//! async fn echo(_ctx: CallContext, data: CallData) -> HandlerResult {
//!     Ok(data)
//! }
//!
//! let handler = Handler::new(echo);
//! ```
//!
//! # Identity
//!
//! Wrapping a function in [`Handler::new`] mints a fresh [`HandlerId`]. Clones
//! of the handle keep that id, and the registry uses it to join key entries
//! with pipeline stages. Wrapping the same function twice yields two distinct
//! handlers.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use crate::error::HandlerResult;
use crate::foundation::context::CallContext;
use crate::foundation::payload::CallData;

/// The handler signature.
#[async_trait]
pub trait CallHandler: Send + Sync + 'static {
    /// Processes one call.
    async fn call(&self, ctx: CallContext, data: CallData) -> HandlerResult;
}

#[async_trait]
impl<F, Fut> CallHandler for F
where
    F: Fn(CallContext, CallData) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, ctx: CallContext, data: CallData) -> HandlerResult {
        (self)(ctx, data).await
    }
}

/// Opaque identity of a [`Handler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HandlerId(u64);

impl HandlerId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handler#{}", self.0)
    }
}

/// A cloneable, identity-carrying handler handle.
#[derive(Clone)]
pub struct Handler {
    id: HandlerId,
    name: &'static str,
    inner: Arc<dyn CallHandler>,
}

impl Handler {
    /// Wraps a handler and mints a new id for it.
    pub fn new<H: CallHandler>(handler: H) -> Self {
        Self {
            id: HandlerId::next(),
            name: std::any::type_name::<H>(),
            inner: Arc::new(handler),
        }
    }

    /// Overrides the name used in log records.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs the handler without any gating.
    pub async fn call(&self, ctx: CallContext, data: CallData) -> HandlerResult {
        self.inner.call(ctx, data).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
