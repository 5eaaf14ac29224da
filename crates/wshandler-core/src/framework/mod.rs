//! Framework layer - registration and dispatch.
//!
//! This module contains the registry's processing pipeline:
//! - Handler trait and identity-carrying handles
//! - Pipeline chains linking handlers into linear sequences
//! - The invocation gate wrapping every handler call
//! - The registry itself and its single-shot and pipelined dispatch paths

pub mod chain;
pub mod dispatcher;
pub mod gate;
pub mod handler;
pub mod registry;

pub use chain::{ChainIndex, Link, Stage, Walk};
pub use gate::Gate;
pub use handler::{CallHandler, Handler, HandlerId};
pub use registry::Registry;
