//! Invocation gate.
//!
//! Every handler call goes through [`Gate::invoke`]. The gate:
//!
//! 1. Races the call context against a short grace period. If the context is
//!    already done, the handler is never invoked.
//! 2. Runs the handler to completion. Honoring the deadline is up to the
//!    handler; if the context ended meanwhile, its output is discarded in
//!    favor of a timeout or cancellation reply.
//! 3. Turns every failure into an in-band payload with status `error` and an
//!    error log record. The gate itself never fails.

use std::time::Duration;

use serde_json::{Value, json};
use tokio::time::sleep;

use crate::error::ContextError;
use crate::foundation::context::CallContext;
use crate::foundation::level::Level;
use crate::foundation::payload::{CANCELLED_MARKER, CallData, MessagePayload, TIMEOUT_MARKER};
use crate::framework::handler::Handler;
use crate::logging::LogSink;

const ORIGIN: &str = "gate";

/// Wraps single handler calls.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    grace: Duration,
}

impl Default for Gate {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Gate {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Calls `handler` with `ctx` and `data`, encoding any failure in the
    /// returned payload.
    pub async fn invoke(
        &self,
        handler: &Handler,
        ctx: CallContext,
        data: CallData,
        sink: &LogSink,
    ) -> CallData {
        tokio::select! {
            biased;
            reason = ctx.done() => return interrupted(handler, &data, reason, sink),
            () = sleep(self.grace) => {}
        }

        // Only the event name and client are needed to build a fallback reply.
        let fallback = data.reply(MessagePayload::new(data.payload.event.clone()));

        let result = handler.call(ctx.clone(), data).await;
        if let Some(reason) = ctx.err() {
            return interrupted(handler, &fallback, reason, sink);
        }

        match result {
            Ok(out) => out,
            Err(err) => {
                let (source, produced) = err.into_parts();
                sink.log(
                    Level::Error,
                    ORIGIN,
                    format_args!("{source}:{}", handler.name()),
                    || vec![describe(&fallback)],
                );
                produced.unwrap_or_else(|| {
                    fallback.reply(MessagePayload::error(
                        fallback.payload.event.clone(),
                        Some(Value::String(source.to_string())),
                    ))
                })
            }
        }
    }
}

/// Builds the reply for a context that ended before or during the call.
fn interrupted(
    handler: &Handler,
    data: &CallData,
    reason: ContextError,
    sink: &LogSink,
) -> CallData {
    sink.log(
        Level::Error,
        ORIGIN,
        format_args!("{reason}:{}", handler.name()),
        || vec![describe(data)],
    );
    let marker = match reason {
        ContextError::DeadlineExceeded => TIMEOUT_MARKER,
        ContextError::Cancelled => CANCELLED_MARKER,
    };
    data.reply(MessagePayload::error(
        data.payload.event.clone(),
        Some(Value::from(marker)),
    ))
}

pub(crate) fn describe(data: &CallData) -> Value {
    json!({
        "payload": data.payload,
        "has_client": data.client.is_some(),
    })
}
