//! Foundation layer - data model shared by every component.
//!
//! This module contains the building blocks the registry works with:
//! - Severity levels and their parsing
//! - Handler keys and call payloads
//! - The cancellable call context

pub mod context;
pub mod level;
pub mod payload;

pub use context::CallContext;
pub use level::Level;
pub use payload::{
    CANCELLED_MARKER, CallData, ClientHandle, HandlerKey, MessagePayload, STATUS_ERROR,
    TIMEOUT_MARKER,
};
