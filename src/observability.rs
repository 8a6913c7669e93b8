//! Request counters

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    requests_accepted: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    strategy_fallbacks: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_accepted(&self) {
        self.requests_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_accepted", "Metric incremented");
    }

    pub fn request_succeeded(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_succeeded", "Metric incremented");
    }

    pub fn request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "requests_failed", "Metric incremented");
    }

    /// A locate strategy came up empty and the next one ran
    pub fn strategy_fallback(&self) {
        self.strategy_fallbacks.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(counter = "strategy_fallbacks", "Metric incremented");
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_accepted: self.requests_accepted.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            strategy_fallbacks: self.strategy_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_accepted: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub strategy_fallbacks: u64,
}
