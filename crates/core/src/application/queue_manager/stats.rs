// Per-queue counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by a queue's gateway and units
#[derive(Debug, Default)]
pub struct QueueStats {
    enqueued: AtomicU64,
    published: AtomicU64,
    publish_failures: AtomicU64,
    consumed: AtomicU64,
    handler_failures: AtomicU64,
    consumer_setup_failures: AtomicU64,
}

impl QueueStats {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    /// A payload was dropped after the broker refused it
    pub fn record_publish_failure(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumed(&self) {
        self.consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_consumer_setup_failure(&self) {
        self.consumer_setup_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> QueueStatsSnapshot {
        QueueStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            consumer_setup_failures: self.consumer_setup_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`QueueStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatsSnapshot {
    pub enqueued: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub consumed: u64,
    pub handler_failures: u64,
    pub consumer_setup_failures: u64,
}
