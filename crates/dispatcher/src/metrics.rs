//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared between a [`SinkHandle`](crate::SinkHandle) and its worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    rendered: AtomicU64,
    failed: AtomicU64,
    /// Snapshots folded into a newer one while the sink was behind
    coalesced: AtomicU64,
    /// Highest sequence number rendered successfully
    last_sequence: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_render(&self, sequence: u64, success: bool) {
        if success {
            self.rendered.fetch_add(1, Ordering::Relaxed);
            self.last_sequence.fetch_max(sequence, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            render_count: self.rendered.load(Ordering::Relaxed),
            failure_count: self.failed.load(Ordering::Relaxed),
            coalesced_count: self.coalesced.load(Ordering::Relaxed),
            last_sequence: self.last_sequence.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub render_count: u64,
    pub failure_count: u64,
    pub coalesced_count: u64,
    /// 0 until the first successful render
    pub last_sequence: u64,
}
