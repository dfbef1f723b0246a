//! Per-sensor block interval latch.
//!
//! One writer (the channel's level-change interrupt) and one reader (the poll
//! loop). The completed `(start_us, end_us)` pair lives in a single
//! `AtomicU64`, start in the high word and end in the low word. "Ready" is
//! "the latched word is not [`EMPTY`]", so readiness and the pair that caused
//! it are always observed together, and `drain` consumes both with one swap.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{ChannelId, Clock, EdgeLevel};

/// Latched word meaning "not ready".
///
/// Equal to the zeroed startup state. It encodes the pair `(0, 0)`, a
/// zero-length interval that would be rejected as degenerate anyway.
const EMPTY: u64 = 0;

#[inline]
const fn pack(start_us: u32, end_us: u32) -> u64 {
    ((start_us as u64) << 32) | end_us as u64
}

#[inline]
const fn unpack(word: u64) -> (u32, u32) {
    ((word >> 32) as u32, word as u32)
}

/// Block interval capture for one beam interrupter
pub struct EdgeChannel {
    id: ChannelId,
    clock: Arc<dyn Clock>,
    /// Start of the interval currently in progress (written by the edge side only)
    armed_start_us: AtomicU32,
    /// Completed pair, or EMPTY
    latched: AtomicU64,
    /// Level changes seen since startup (diagnostics)
    edges: AtomicU64,
}

impl fmt::Debug for EdgeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgeChannel")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .field("edges", &self.edge_count())
            .finish()
    }
}

impl EdgeChannel {
    /// Create a channel with zeroed timestamps
    pub fn new(id: ChannelId, clock: Arc<dyn Clock>) -> Self {
        Self {
            id,
            clock,
            armed_start_us: AtomicU32::new(0),
            latched: AtomicU64::new(EMPTY),
            edges: AtomicU64::new(0),
        }
    }

    /// Channel identity
    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Level-change handler, samples the clock itself.
    ///
    /// Safe to call from interrupt context: no locks, no allocation.
    #[inline]
    pub fn on_edge(&self, level: EdgeLevel) {
        self.on_edge_at(level, self.clock.now_us());
    }

    /// Level-change handler with an already sampled timestamp
    #[inline]
    pub fn on_edge_at(&self, level: EdgeLevel, now_us: u32) {
        self.edges.fetch_add(1, Ordering::Relaxed);
        match level {
            EdgeLevel::Blocked => {
                // A new interval starts: anything latched but unconsumed is superseded.
                self.armed_start_us.store(now_us, Ordering::Relaxed);
                self.latched.store(EMPTY, Ordering::Release);
            }
            EdgeLevel::Clear => {
                let start_us = self.armed_start_us.load(Ordering::Relaxed);
                self.latched
                    .store(pack(start_us, now_us), Ordering::Release);
            }
        }
    }

    /// Take the completed interval, if any.
    ///
    /// Returns `Some((start_us, end_us))` at most once per completed interval.
    #[inline]
    pub fn drain(&self) -> Option<(u32, u32)> {
        let word = self.latched.swap(EMPTY, Ordering::AcqRel);
        (word != EMPTY).then(|| unpack(word))
    }

    /// Whether a completed interval is waiting
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.latched.load(Ordering::Acquire) != EMPTY
    }

    /// Level changes seen since startup
    #[inline]
    pub fn edge_count(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }
}
