//! Error types for the wshandler core.
//!
//! Two families are kept apart:
//!
//! - [`RegistryError`] describes configuration failures. They surface through
//!   the sticky error state of a [`Registry`](crate::Registry) or through
//!   [`Registry::try_handle`](crate::Registry::try_handle).
//! - [`DispatchError`] describes lookup failures at call time. Handler and
//!   timeout failures never become a `DispatchError`; they travel in-band as
//!   payloads whose status is `error`.

use thiserror::Error;

use crate::foundation::payload::{CallData, HandlerKey, MessagePayload};
use crate::framework::handler::HandlerId;

/// A boxed error that can cross task boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// =============================================================================
// Level Errors
// =============================================================================

/// Returned when text does not name a [`Level`](crate::Level).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a valid Level: {input:?}")]
pub struct ParseLevelError {
    input: String,
}

impl ParseLevelError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// The rejected text.
    pub fn input(&self) -> &str {
        &self.input
    }
}

// =============================================================================
// Context Errors
// =============================================================================

/// Why a [`CallContext`](crate::CallContext) is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The context was cancelled explicitly.
    #[error("context canceled")]
    Cancelled,
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while registering handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A handler is already registered under this key.
    #[error("handler already registered for {key}")]
    KeyRegistered {
        /// The duplicate key.
        key: HandlerKey,
    },

    /// The declared parent has never been registered.
    #[error("there is no registered parent handler: {parent} (child {handler})")]
    ParentNotRegistered {
        /// The handler being registered.
        handler: HandlerId,
        /// The missing parent.
        parent: HandlerId,
    },

    /// The declared parent already continues into another handler.
    #[error("the parent handler {parent} already has a child (child {handler})")]
    ParentHasChild {
        /// The handler being registered.
        handler: HandlerId,
        /// The parent that already has a child.
        parent: HandlerId,
    },

    /// The handler being linked already continues into another handler.
    #[error("the handler {handler} already has a child")]
    HandlerHasChild {
        /// The handler being registered.
        handler: HandlerId,
    },

    /// The handler being linked is already the child of another parent.
    #[error("the handler {handler} already has a parent")]
    HandlerHasParent {
        /// The handler being registered.
        handler: HandlerId,
    },

    /// A handler was declared as its own parent.
    #[error("the handler {handler} cannot be its own parent")]
    SelfLink {
        /// The handler being registered.
        handler: HandlerId,
    },

    /// A handler without parent was registered as a chain root twice.
    #[error("the handler {handler} is already declared")]
    DuplicateRoot {
        /// The handler being registered.
        handler: HandlerId,
    },

    /// `set_log_level` received an unknown level.
    #[error("SetLogLevel: {0}")]
    InvalidLogLevel(#[from] ParseLevelError),
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors returned directly by dispatch calls.
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    /// No handler is registered under the key.
    #[error("handler has not been registered: {key}")]
    NotRegistered {
        /// The key that missed.
        key: HandlerKey,
        /// The error payload delivered in place of a handler result.
        payload: MessagePayload,
    },

    /// The pipeline consumer dropped its receiver before the chain finished.
    #[error("pipeline output channel closed: {key}")]
    ChannelClosed {
        /// The key whose pipeline was running.
        key: HandlerKey,
    },
}

impl DispatchError {
    pub(crate) fn not_registered(key: &HandlerKey, event: &str) -> Self {
        Self::NotRegistered {
            key: key.clone(),
            payload: MessagePayload::error(event, None),
        }
    }

    /// The synthetic error payload attached to a lookup miss.
    pub fn payload(&self) -> Option<&MessagePayload> {
        match self {
            Self::NotRegistered { payload, .. } => Some(payload),
            Self::ChannelClosed { .. } => None,
        }
    }

    /// Converts a lookup miss into the call data a caller would have received.
    pub fn into_call_data(self) -> Option<CallData> {
        match self {
            Self::NotRegistered { payload, .. } => Some(CallData::new(payload)),
            Self::ChannelClosed { .. } => None,
        }
    }
}

// =============================================================================
// Handler Errors
// =============================================================================

/// Failure reported by a handler.
///
/// A handler may still hand back the data it produced before failing; the
/// gate forwards that data to the caller after logging the failure.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct HandlerError {
    source: BoxError,
    data: Option<CallData>,
}

impl HandlerError {
    /// Creates a failure without produced data.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
            data: None,
        }
    }

    /// Creates a failure that still carries produced data.
    pub fn with_data(source: impl Into<BoxError>, data: CallData) -> Self {
        Self {
            source: source.into(),
            data: Some(data),
        }
    }

    /// Returns the produced data, if any.
    pub fn data(&self) -> Option<&CallData> {
        self.data.as_ref()
    }

    /// Splits into the message and the produced data.
    pub fn into_parts(self) -> (BoxError, Option<CallData>) {
        (self.source, self.data)
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registration.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type for dispatch calls.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type returned by handlers.
pub type HandlerResult = Result<CallData, HandlerError>;
