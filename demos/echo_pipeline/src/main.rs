//! Echo Pipeline Example
//!
//! Registers a three-step chain and drives it both ways:
//!
//! ```text
//! echo/request ──▶ echo/trimmed ──▶ echo/signed
//!     trim             shout            sign
//! ```
//!
//! - `call` on `echo/request` runs `trim` only.
//! - `stream_pipeline` on `echo/request` runs all three steps and prints every
//!   intermediate payload.
//! - `--fail` swaps `shout` for a step that answers with an error payload, which
//!   stops the chain before `sign`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-pipeline -- "  hello pipeline  "
//! WSHANDLER_DISPATCH__LOG_LEVEL=debug cargo run --package echo-pipeline -- --fail
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde_json::{Value, json};
use tracing::{error, info, warn};
use wshandler::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "echo-pipeline", about = "Dispatch a message through an echo pipeline")]
struct Args {
    /// Configuration file; defaults to searching for wshandler.toml.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile.
    #[arg(short, long)]
    profile: Option<String>,

    /// Make the second step reject the message.
    #[arg(long)]
    fail: bool,

    /// Text to send.
    #[arg(default_value = "  hello pipeline  ")]
    text: String,
}

/// Stands in for a websocket connection.
#[derive(Debug)]
struct Connection {
    id: u64,
}

fn text_of(data: &CallData) -> String {
    match &data.payload.data {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(map)) => map
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

// ============================================================================
// Handler Functions
// ============================================================================

async fn trim(_ctx: CallContext, data: CallData) -> HandlerResult {
    let text = text_of(&data).trim().to_string();
    if text.is_empty() {
        return Err(HandlerError::new("empty message"));
    }
    Ok(data.reply(
        MessagePayload::new("echo")
            .with_data(text)
            .with_status("trimmed"),
    ))
}

async fn shout(_ctx: CallContext, data: CallData) -> HandlerResult {
    let text = text_of(&data).to_uppercase();
    Ok(data.reply(
        MessagePayload::new("echo")
            .with_data(text)
            .with_status("shouted"),
    ))
}

async fn reject(_ctx: CallContext, data: CallData) -> HandlerResult {
    Ok(data.reply(MessagePayload::error(
        "echo",
        Some(json!("rejected by policy")),
    )))
}

async fn sign(_ctx: CallContext, data: CallData) -> HandlerResult {
    let connection = data.client_as::<Connection>().map(|c| c.id);
    let body = json!({ "text": text_of(&data), "connection": connection });
    Ok(data.reply(
        MessagePayload::new("echo")
            .with_data(body)
            .with_status("ok")
            .with_broadcast(true),
    ))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    let registry = bootstrap_with(loader).await?;

    let first = Handler::new(trim).named("trim");
    let middle = if args.fail {
        Handler::new(reject).named("reject")
    } else {
        Handler::new(shout).named("shout")
    };
    let last = Handler::new(sign).named("sign");

    registry
        .handle(("echo", "request"), &first, None)
        .await
        .handle(("echo", "trimmed"), &middle, Some(&first))
        .await
        .handle(("echo", "signed"), &last, Some(&middle))
        .await;
    registry.check().await?;

    let key = HandlerKey::new("echo", "request");
    let request = CallData::new(MessagePayload::new("echo").with_data(args.text.clone()))
        .with_client(Connection { id: 1 });

    // Single-shot
    let reply = registry
        .call(CallContext::background(), &key, request.clone())
        .await?;
    info!(payload = ?reply.payload, "call");

    // Lookup miss
    let unknown = HandlerKey::new("echo", "unknown");
    if let Err(err) = registry
        .call(CallContext::background(), &unknown, request.clone())
        .await
    {
        warn!(error = %err, payload = ?err.payload(), "call");
    }

    // Pipeline
    let (mut rx, task) = registry.stream_pipeline(CallContext::background(), key, request);
    while let Some(payload) = rx.recv().await {
        if payload.is_error() {
            error!(payload = ?payload, "pipeline step failed");
        } else {
            info!(payload = ?payload, "pipeline step");
        }
    }
    task.await??;

    Ok(())
}
