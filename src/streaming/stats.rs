//! Playback statistics for monitoring overruns and underruns
//!
//! Counters are plain atomics so the real-time callback can update them
//! without taking a lock.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters shared by producer and consumer
#[derive(Debug, Default)]
pub struct StreamStats {
    rendered: AtomicU64,
    queued: AtomicU64,
    dropped: AtomicU64,
    played: AtomicU64,
    underruns: AtomicU64,
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Buffers mixed by the producer
    pub rendered: u64,
    /// Buffers accepted by the ring
    pub queued: u64,
    /// Buffers discarded because the ring was full (overruns)
    pub dropped: u64,
    /// Buffers copied to the device
    pub played: u64,
    /// Callback invocations answered with silence
    pub underruns: u64,
}

impl StreamStats {
    pub(crate) fn record_rendered(&self) {
        self.rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_queued(&self) {
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_played(&self) {
        self.played.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_underrun(&self) {
        self.underruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            rendered: self.rendered.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            played: self.played.load(Ordering::Relaxed),
            underruns: self.underruns.load(Ordering::Relaxed),
        }
    }
}
