//! Structured log records and the logger collaborator.
//!
//! The registry never writes output itself. Each log call builds a
//! [`LogRecord`], filters it against the registry's threshold, and hands it
//! to a [`Logger`]. The default [`TracingLogger`] forwards records to the
//! `tracing` macros so that whatever subscriber the application installed
//! decides on formatting and destination.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::foundation::level::Level;

/// Module name stamped on every record.
pub const MODULE: &str = "wshandler";

/// One structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// Unique id of this entry.
    pub id: String,
    /// The logged event, usually an error message.
    pub event: String,
    /// Severity.
    pub level: Level,
    /// Emitting module.
    pub module: &'static str,
    /// Operation that produced the record.
    pub origin: &'static str,
    /// Auxiliary values (payloads, keys, client flags).
    pub body: Vec<Value>,
}

impl LogRecord {
    /// Creates a record with a fresh id.
    pub fn new(level: Level, origin: &'static str, event: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event: event.into(),
            level,
            module: MODULE,
            origin,
            body: Vec::new(),
        }
    }
}

/// Receiver of log records.
///
/// The registry only ever calls [`print`](Logger::print). The terminating
/// variants belong to the logger's contract for applications that share it.
pub trait Logger: Send + Sync {
    /// Emits one record.
    fn print(&self, record: &LogRecord);

    /// Emits `record`, then exits the process with status 1.
    fn fatal(&self, record: &LogRecord) -> ! {
        self.print(record);
        std::process::exit(1)
    }

    /// Emits `record`, then panics with its event.
    fn panic(&self, record: &LogRecord) -> ! {
        self.print(record);
        panic!("{}", record.event)
    }
}

/// A shared logger.
pub type BoxedLogger = Arc<dyn Logger>;

/// Forwards records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn print(&self, record: &LogRecord) {
        let body = Value::Array(record.body.clone());
        match record.level {
            Level::Panic | Level::Fatal | Level::Error => error!(
                id = %record.id,
                module = record.module,
                origin = record.origin,
                severity = %record.level,
                body = %body,
                "{}",
                record.event
            ),
            Level::Warn => warn!(
                id = %record.id,
                module = record.module,
                origin = record.origin,
                body = %body,
                "{}",
                record.event
            ),
            Level::Info => info!(
                id = %record.id,
                module = record.module,
                origin = record.origin,
                body = %body,
                "{}",
                record.event
            ),
            Level::Debug => debug!(
                id = %record.id,
                module = record.module,
                origin = record.origin,
                body = %body,
                "{}",
                record.event
            ),
            Level::Trace => trace!(
                id = %record.id,
                module = record.module,
                origin = record.origin,
                body = %body,
                "{}",
                record.event
            ),
        }
    }
}

/// A logger behind a severity threshold.
///
/// Records are only built when their level passes the threshold, so callers
/// can pass expensive bodies lazily.
pub struct LogSink {
    logger: BoxedLogger,
    threshold: RwLock<Level>,
}

impl LogSink {
    pub fn new(logger: BoxedLogger, threshold: Level) -> Self {
        Self {
            logger,
            threshold: RwLock::new(threshold),
        }
    }

    pub fn threshold(&self) -> Level {
        *self.threshold.read()
    }

    pub fn set_threshold(&self, level: Level) {
        *self.threshold.write() = level;
    }

    pub fn enabled(&self, level: Level) -> bool {
        level.enabled_at(self.threshold())
    }

    /// Emits a record if `level` passes the threshold.
    pub fn log<F>(&self, level: Level, origin: &'static str, event: impl fmt::Display, body: F)
    where
        F: FnOnce() -> Vec<Value>,
    {
        if !self.enabled(level) {
            return;
        }
        let mut record = LogRecord::new(level, origin, event.to_string());
        record.body = body();
        self.logger.print(&record);
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("threshold", &self.threshold())
            .finish()
    }
}

/// Keeps every record in memory.
///
/// Useful in tests and for embedding applications that ship records
/// elsewhere in batches.
#[derive(Debug, Default)]
pub struct CollectingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl CollectingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all records received so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Returns the records at exactly `level`.
    pub fn at(&self, level: Level) -> Vec<LogRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }
}

impl Logger for CollectingLogger {
    fn print(&self, record: &LogRecord) {
        self.records.lock().push(record.clone());
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn print(&self, record: &LogRecord) {
        (**self).print(record);
    }
}
