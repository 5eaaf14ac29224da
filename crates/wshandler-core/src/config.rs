//! Dispatch configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How pipeline steps share time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepBudget {
    /// Every step gets a fresh `step_timeout` derived from the caller's
    /// context. Total pipeline latency is unbounded.
    #[default]
    PerStep,
    /// One `step_timeout` deadline covers the whole chain.
    Shared,
}

/// Settings consumed by [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Minimum severity threshold for log records.
    pub log_level: String,

    /// Minimum delay before a handler is invoked, in milliseconds.
    pub grace_period_ms: u64,

    /// Pipeline step timeout in milliseconds.
    pub step_timeout_ms: u64,

    /// Whether pipeline steps get their own timeout or share one.
    pub step_budget: StepBudget,

    /// Channel capacity for [`Registry::stream_pipeline`](crate::Registry::stream_pipeline).
    pub pipeline_buffer: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            grace_period_ms: 1,
            step_timeout_ms: 30_000,
            step_budget: StepBudget::PerStep,
            pipeline_buffer: 16,
        }
    }
}

impl DispatchConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }
}
