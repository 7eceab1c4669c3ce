use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;

/// Process-local activity counters, logged when a long-running session ends.
/// All counters are atomic so clones of the state share them.
#[derive(Clone, Default)]
pub struct Metrics {
    pub tasks_added: Arc<AtomicU64>,
    pub tasks_completed: Arc<AtomicU64>,
    pub tasks_reopened: Arc<AtomicU64>,
    pub days_closed: Arc<AtomicU64>,
    /// Operations that failed in the store layer
    pub store_errors: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tasks_added: u64,
    pub tasks_completed: u64,
    pub tasks_reopened: u64,
    pub days_closed: u64,
    pub store_errors: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_task_added(&self) {
        self.tasks_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_completed(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_task_reopened(&self) {
        self.tasks_reopened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_day_closed(&self) {
        self.days_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_added: self.tasks_added.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_reopened: self.tasks_reopened.load(Ordering::Relaxed),
            days_closed: self.days_closed.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}
