//! Dispatch paths of the [`Registry`].
//!
//! - [`Registry::call`] runs one handler through the gate and returns its
//!   result.
//! - [`Registry::call_pipeline`] walks the chain starting at the addressed
//!   handler. Each step's output feeds the next step and is pushed onto an
//!   output channel in chain order. The walk stops after the first payload
//!   whose status is `error`.
//!
//! Only lookup misses and a closed output channel are reported through the
//! returned `Result`. Handler failures and timeouts travel in-band, so
//! pipeline consumers must inspect the streamed payloads as well.
//!
//! ```rust,ignore
//! let (tx, mut rx) = mpsc::channel(8);
//! let key = HandlerKey::new("login", "request");
//! registry.call_pipeline(CallContext::background(), &key, data, &tx).await?;
//! drop(tx);
//!
//! while let Some(payload) = rx.recv().await {
//!     if payload.is_error() {
//!         break;
//!     }
//! }
//! ```

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::config::StepBudget;
use crate::error::{DispatchError, DispatchResult};
use crate::foundation::context::CallContext;
use crate::foundation::level::Level;
use crate::foundation::payload::{CallData, HandlerKey, MessagePayload};
use crate::framework::gate::describe;
use crate::framework::registry::Registry;

impl Registry {
    /// Runs the handler registered under `key` once.
    ///
    /// Returns `Ok` with the gate's result, which may itself be an error
    /// payload. A lookup miss returns [`DispatchError::NotRegistered`]
    /// carrying the error payload for the caller's event.
    #[instrument(name = "call", skip_all, fields(key = %key))]
    pub async fn call(
        &self,
        ctx: CallContext,
        key: &HandlerKey,
        data: CallData,
    ) -> DispatchResult<CallData> {
        let state = self.state.read().await;
        self.trace_io("call", "in", key, &data);

        let Some(handler) = state.routes.get(key) else {
            return Err(DispatchError::not_registered(key, &data.payload.event));
        };

        let out = self.gate.invoke(handler, ctx, data, &self.sink).await;
        self.trace_io("call", "out", key, &out);
        Ok(out)
    }

    /// Runs the chain starting at the handler registered under `key`,
    /// pushing every step's payload onto `out`.
    ///
    /// Each step runs under a context derived from `ctx` with the configured
    /// step timeout. Sending waits for channel capacity, so a slow consumer
    /// holds back the chain.
    #[instrument(name = "call_pipeline", skip_all, fields(key = %key))]
    pub async fn call_pipeline(
        &self,
        ctx: CallContext,
        key: &HandlerKey,
        data: CallData,
        out: &mpsc::Sender<MessagePayload>,
    ) -> DispatchResult<()> {
        let state = self.state.read().await;
        self.trace_io("call_pipeline", "in", key, &data);

        let Some(entry) = state.routes.get(key) else {
            let err = DispatchError::not_registered(key, &data.payload.event);
            if let Some(payload) = err.payload() {
                if out.send(payload.clone()).await.is_err() {
                    self.sink.log(
                        Level::Warn,
                        "call_pipeline",
                        format_args!("output channel closed on lookup miss:{key}"),
                        Vec::new,
                    );
                }
            }
            // The miss outranks the closed channel.
            return Err(err);
        };

        let shared = match self.config.step_budget {
            StepBudget::PerStep => None,
            StepBudget::Shared => Some(ctx.with_timeout(self.config.step_timeout())),
        };

        let mut data = data;
        for (step, stage) in state.chains.walk(entry.id()).enumerate() {
            let step_ctx = match &shared {
                Some(budget) => budget.with_cancel(),
                None => ctx.with_timeout(self.config.step_timeout()),
            };

            data = self
                .gate
                .invoke(&stage.handler, step_ctx, data, &self.sink)
                .await;
            let failed = data.payload.is_error();

            if out.send(data.payload.clone()).await.is_err() {
                self.sink.log(
                    Level::Warn,
                    "call_pipeline",
                    format_args!("output channel closed at step {step}:{key}"),
                    Vec::new,
                );
                return Err(DispatchError::ChannelClosed { key: key.clone() });
            }
            if failed {
                break;
            }
        }

        self.trace_io("call_pipeline", "out", key, &data);
        Ok(())
    }

    /// Spawns [`call_pipeline`](Self::call_pipeline) on a task and returns
    /// the receiving end of its output channel.
    ///
    /// The channel holds `pipeline_buffer` payloads. The task ends with the
    /// pipeline's result.
    pub fn stream_pipeline(
        self: &Arc<Self>,
        ctx: CallContext,
        key: impl Into<HandlerKey>,
        data: CallData,
    ) -> (
        mpsc::Receiver<MessagePayload>,
        JoinHandle<DispatchResult<()>>,
    ) {
        let (tx, rx) = mpsc::channel(self.config.pipeline_buffer.max(1));
        let registry = Arc::clone(self);
        let key = key.into();
        let task =
            tokio::spawn(async move { registry.call_pipeline(ctx, &key, data, &tx).await });
        (rx, task)
    }

    fn trace_io(&self, origin: &'static str, direction: &str, key: &HandlerKey, data: &CallData) {
        self.sink.log(
            Level::Debug,
            origin,
            format_args!("{direction}:{key}"),
            || vec![describe(data)],
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::Value;
    use tokio::time::sleep;

    use super::*;
    use crate::config::DispatchConfig;
    use crate::error::{HandlerError, HandlerResult};
    use crate::foundation::payload::TIMEOUT_MARKER;
    use crate::framework::handler::Handler;
    use crate::logging::{CollectingLogger, TracingLogger};

    fn key(event: &str) -> HandlerKey {
        HandlerKey::new(event, "ok")
    }

    fn input(event: &str) -> CallData {
        CallData::new(MessagePayload::new(event)).with_client(7_u32)
    }

    /// A handler that appends `tag` to a JSON array in the payload data.
    fn append(tag: &'static str) -> Handler {
        Handler::new(move |_ctx: CallContext, data: CallData| async move {
            let mut trail = match data.payload.data.clone() {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            trail.push(Value::from(tag));
            let payload = data.payload.clone().with_data(trail).with_status("ok");
            Ok::<_, HandlerError>(data.reply(payload))
        })
        .named(tag)
    }

    fn sleeper(secs: u64) -> Handler {
        Handler::new(move |_ctx: CallContext, data: CallData| async move {
            sleep(Duration::from_secs(secs)).await;
            Ok::<_, HandlerError>(data.reply(data.payload.clone().with_status("ok")))
        })
    }

    async fn drain(mut rx: mpsc::Receiver<MessagePayload>) -> Vec<MessagePayload> {
        let mut items = Vec::new();
        while let Some(payload) = rx.recv().await {
            items.push(payload);
        }
        items
    }

    #[tokio::test]
    async fn test_call_returns_handler_output() {
        let registry = Registry::default();
        registry.handle(key("chat"), &append("a"), None).await;

        let out = registry
            .call(CallContext::background(), &key("chat"), input("chat"))
            .await
            .unwrap();
        assert_eq!(out.payload.data, Some(Value::from(vec!["a"])));
        assert_eq!(out.client_as::<u32>(), Some(&7));
    }

    #[tokio::test]
    async fn test_call_miss_keeps_event() {
        let registry = Registry::default();
        let err = registry
            .call(CallContext::background(), &key("missing"), input("join"))
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotRegistered { .. }));
        let payload = err.payload().unwrap();
        assert_eq!(payload.event, "join");
        assert!(payload.is_error());
    }

    #[tokio::test]
    async fn test_call_reports_handler_failure_in_band() {
        async fn failing(_ctx: CallContext, _data: CallData) -> HandlerResult {
            Err(HandlerError::new("db down"))
        }

        let registry = Registry::default();
        registry.handle(key("chat"), &Handler::new(failing), None).await;

        let out = registry
            .call(CallContext::background(), &key("chat"), input("chat"))
            .await
            .unwrap();
        assert!(out.payload.is_error());
        assert_eq!(out.payload.data, Some(Value::from("db down")));
    }

    #[tokio::test]
    async fn test_call_only_runs_the_addressed_handler() {
        let (a, b) = (append("a"), append("b"));
        let registry = Registry::default();
        registry
            .handle(key("first"), &a, None)
            .await
            .handle(key("second"), &b, Some(&a))
            .await;

        let out = registry
            .call(CallContext::background(), &key("first"), input("first"))
            .await
            .unwrap();
        assert_eq!(out.payload.data, Some(Value::from(vec!["a"])));
    }

    #[tokio::test]
    async fn test_pipeline_feeds_each_step_in_order() {
        let (a, b, c) = (append("a"), append("b"), append("c"));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await
            .handle(key("c"), &c, Some(&b))
            .await;

        let (tx, rx) = mpsc::channel(8);
        registry
            .call_pipeline(CallContext::background(), &key("a"), input("chat"), &tx)
            .await
            .unwrap();
        drop(tx);

        let trails: Vec<_> = drain(rx).await.into_iter().map(|p| p.data).collect();
        assert_eq!(
            trails,
            vec![
                Some(Value::from(vec!["a"])),
                Some(Value::from(vec!["a", "b"])),
                Some(Value::from(vec!["a", "b", "c"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_starts_mid_chain() {
        let (a, b) = (append("a"), append("b"));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await;

        let (tx, rx) = mpsc::channel(8);
        registry
            .call_pipeline(CallContext::background(), &key("b"), input("chat"), &tx)
            .await
            .unwrap();
        drop(tx);

        let payloads = drain(rx).await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].data, Some(Value::from(vec!["b"])));
    }

    #[tokio::test]
    async fn test_pipeline_miss_pushes_one_error_payload() {
        let registry = Registry::default();
        let (tx, rx) = mpsc::channel(8);
        let err = registry
            .call_pipeline(CallContext::background(), &key("nope"), input("join"), &tx)
            .await
            .unwrap_err();
        drop(tx);

        assert!(matches!(err, DispatchError::NotRegistered { .. }));
        let payloads = drain(rx).await;
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].event, "join");
        assert!(payloads[0].is_error());
    }

    #[tokio::test]
    async fn test_pipeline_miss_with_closed_channel_warns() {
        let logger = Arc::new(CollectingLogger::new());
        let registry = Registry::new(logger.clone());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let err = registry
            .call_pipeline(CallContext::background(), &key("nope"), input("join"), &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::NotRegistered { .. }));
        let warnings = logger.at(Level::Warn);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].event, "output channel closed on lookup miss:nope/ok");
        assert_eq!(warnings[0].origin, "call_pipeline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_step_budget_is_fresh_for_every_step() {
        let (a, b, c) = (sleeper(20), sleeper(20), sleeper(20));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await
            .handle(key("c"), &c, Some(&b))
            .await;

        let (tx, rx) = mpsc::channel(8);
        registry
            .call_pipeline(CallContext::background(), &key("a"), input("slow"), &tx)
            .await
            .unwrap();
        drop(tx);

        let payloads = drain(rx).await;
        assert_eq!(payloads.len(), 3);
        assert!(payloads.iter().all(|p| !p.is_error()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_budget_covers_the_whole_chain() {
        let (a, b, c) = (sleeper(20), sleeper(20), sleeper(20));
        let config = DispatchConfig {
            step_budget: StepBudget::Shared,
            ..Default::default()
        };
        let registry = Registry::with_config(TracingLogger, config);
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await
            .handle(key("c"), &c, Some(&b))
            .await;

        let (tx, rx) = mpsc::channel(8);
        registry
            .call_pipeline(CallContext::background(), &key("a"), input("slow"), &tx)
            .await
            .unwrap();
        drop(tx);

        let payloads = drain(rx).await;
        assert_eq!(payloads.len(), 2);
        assert!(!payloads[0].is_error());
        assert_eq!(payloads[1].data, Some(Value::from(TIMEOUT_MARKER)));
    }

    #[tokio::test]
    async fn test_closed_channel_stops_the_chain() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = |calls: Arc<AtomicUsize>| {
            Handler::new(move |_ctx: CallContext, data: CallData| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, HandlerError>(data)
                }
            })
        };
        let (a, b) = (counter(calls.clone()), counter(calls.clone()));
        let registry = Registry::default();
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await;

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = registry
            .call_pipeline(CallContext::background(), &key("a"), input("chat"), &tx)
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::ChannelClosed { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stream_pipeline() {
        let (a, b) = (append("a"), append("b"));
        let registry = Arc::new(Registry::default());
        registry
            .handle(key("a"), &a, None)
            .await
            .handle(key("b"), &b, Some(&a))
            .await;

        let (rx, task) = registry.stream_pipeline(
            CallContext::background(),
            ("a", "ok"),
            input("chat"),
        );
        let payloads = drain(rx).await;
        assert_eq!(payloads.len(), 2);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_waits_for_registration_lock() {
        let registry = Registry::default();
        registry.handle(key("chat"), &append("a"), None).await;

        let chat = key("chat");
        let guard = registry.state.write().await;
        let mut call = Box::pin(registry.call(CallContext::background(), &chat, input("chat")));
        assert!(futures::poll!(call.as_mut()).is_pending());

        drop(guard);
        let out = call.await.unwrap();
        assert_eq!(out.payload.data, Some(Value::from(vec!["a"])));
    }

    #[tokio::test]
    async fn test_dispatch_logs_in_and_out_at_debug() {
        let logger = Arc::new(CollectingLogger::new());
        let registry = Registry::new(logger.clone());
        registry
            .set_log_level("debug")
            .await
            .handle(key("chat"), &append("a"), None)
            .await;

        registry
            .call(CallContext::background(), &key("chat"), input("chat"))
            .await
            .unwrap();

        let events: Vec<_> = logger
            .at(Level::Debug)
            .into_iter()
            .filter(|r| r.origin == "call")
            .map(|r| r.event)
            .collect();
        assert_eq!(events, vec!["in:chat/ok", "out:chat/ok"]);
    }
}
