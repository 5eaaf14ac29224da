//! Keys and payloads exchanged with handlers.
//!
//! A [`HandlerKey`] pairs an event name with a status tag and addresses one
//! registered handler. Each call carries a [`CallData`]: an opaque client
//! handle plus the decoded [`MessagePayload`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status value marking a failed call.
pub const STATUS_ERROR: &str = "error";

/// Payload data used when a context deadline passed.
pub const TIMEOUT_MARKER: &str = "timeout reached";

/// Payload data used when a context was cancelled.
pub const CANCELLED_MARKER: &str = "context cancelled";

/// Opaque per-caller context, typically a connection identity.
pub type ClientHandle = Arc<dyn Any + Send + Sync>;

/// Registry key: an event name paired with a status tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandlerKey {
    pub event: String,
    pub status: String,
}

impl HandlerKey {
    pub fn new(event: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            status: status.into(),
        }
    }
}

impl fmt::Display for HandlerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.event, self.status)
    }
}

impl<E: Into<String>, S: Into<String>> From<(E, S)> for HandlerKey {
    fn from((event, status): (E, S)) -> Self {
        Self::new(event, status)
    }
}

/// A decoded message.
///
/// `broadcast` is routing metadata for the transport that owns the payload and
/// is never serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip)]
    pub broadcast: bool,
}

impl MessagePayload {
    /// Creates a payload with only an event name.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            ..Default::default()
        }
    }

    /// Creates an error-status payload for `event`.
    pub fn error(event: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            event: event.into(),
            data,
            status: Some(STATUS_ERROR.to_string()),
            broadcast: false,
        }
    }

    /// Sets the data value.
    pub fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets the status tag.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Marks the payload for broadcast.
    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }

    /// Returns `true` if the status is [`STATUS_ERROR`].
    pub fn is_error(&self) -> bool {
        self.status.as_deref() == Some(STATUS_ERROR)
    }
}

/// Everything a handler receives and returns.
#[derive(Clone, Default)]
pub struct CallData {
    pub client: Option<ClientHandle>,
    pub payload: MessagePayload,
}

impl CallData {
    /// Creates call data without a client handle.
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            client: None,
            payload,
        }
    }

    /// Attaches a client handle.
    pub fn with_client<C: Any + Send + Sync>(mut self, client: C) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Replaces the payload while keeping the client handle.
    pub fn reply(&self, payload: MessagePayload) -> Self {
        Self {
            client: self.client.clone(),
            payload,
        }
    }

    /// Downcasts the client handle.
    pub fn client_as<C: Any + Send + Sync>(&self) -> Option<&C> {
        self.client.as_ref().and_then(|c| c.downcast_ref::<C>())
    }
}

impl fmt::Debug for CallData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallData")
            .field("has_client", &self.client.is_some())
            .field("payload", &self.payload)
            .finish()
    }
}
