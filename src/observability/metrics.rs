//! Metrics registry
//!
//! Counters only, monotonic, reset on process start. Shared between
//! threads without locks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of the planner and collectors
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    plans_created: AtomicU64,
    plans_rejected: AtomicU64,
    /// Pairwise reductions of whole responses
    reductions: AtomicU64,
    /// Outputs that failed to reduce
    reduction_errors: AtomicU64,
    gathers: AtomicU64,
    /// Outputs that failed to project
    gather_errors: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_plans_created(&self) {
        self.plans_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reductions(&self) {
        self.reductions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_reduction_errors(&self, count: u64) {
        self.reduction_errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_gathers(&self) {
        self.gathers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_gather_errors(&self, count: u64) {
        self.gather_errors.fetch_add(count, Ordering::Relaxed);
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            plans_created: self.plans_created.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            reductions: self.reductions.load(Ordering::Relaxed),
            reduction_errors: self.reduction_errors.load(Ordering::Relaxed),
            gathers: self.gathers.load(Ordering::Relaxed),
            gather_errors: self.gather_errors.load(Ordering::Relaxed),
        }
    }

    /// Snapshot rendered as a JSON object
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_default()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub plans_created: u64,
    pub plans_rejected: u64,
    pub reductions: u64,
    pub reduction_errors: u64,
    pub gathers: u64,
    pub gather_errors: u64,
}
