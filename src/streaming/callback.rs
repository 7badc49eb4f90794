//! Consumer side of the ring, run on the device's real-time thread
//!
//! The callback must finish within the hardware period: it takes the ring
//! lock once, copies one buffer and returns. An empty ring is answered with
//! silence so stale samples never reach the device.

use super::ring_buffer::{FrameRing, PopStatus};
use super::stats::StreamStats;
use super::CHANNELS;
use crate::frame::BYTES_PER_SAMPLE;
use crate::{AudioError, Result};
use std::sync::Arc;

/// Fills device output regions from a [`FrameRing`]
#[derive(Debug, Clone)]
pub struct PlaybackCallback {
    ring: Arc<FrameRing>,
    stats: Arc<StreamStats>,
}

impl PlaybackCallback {
    /// Create a callback draining `ring`
    pub fn new(ring: Arc<FrameRing>, stats: Arc<StreamStats>) -> Self {
        PlaybackCallback { ring, stats }
    }

    /// Samples the device must request per invocation
    pub fn expected_samples(&self) -> usize {
        self.ring.frames() * CHANNELS
    }

    /// Bytes the device must request per invocation
    pub fn expected_bytes(&self) -> usize {
        self.expected_samples() * BYTES_PER_SAMPLE
    }

    fn check_len(&self, got: usize) -> Result<()> {
        let expected = self.expected_bytes();
        if got != expected {
            return Err(AudioError::CallbackLength { expected, got });
        }
        Ok(())
    }

    /// Fill `out` with the next queued buffer, or silence on underrun
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::CallbackLength`] when `out` is not exactly one
    /// buffer long. The stream is misconfigured at that point and callers
    /// should not keep invoking the callback.
    pub fn fill(&mut self, out: &mut [i16]) -> Result<PopStatus> {
        self.check_len(out.len() * BYTES_PER_SAMPLE)?;

        let status = self.ring.try_pop_into(out);
        self.finish(status, || out.fill(0));
        Ok(status)
    }

    /// Byte-oriented variant of [`PlaybackCallback::fill`] for raw device
    /// regions (native-endian signed 16-bit)
    pub fn fill_bytes(&mut self, out: &mut [u8]) -> Result<PopStatus> {
        self.check_len(out.len())?;

        let status = self.ring.try_pop_with(|samples| {
            for (dst, sample) in out.chunks_exact_mut(BYTES_PER_SAMPLE).zip(samples) {
                dst.copy_from_slice(&sample.to_ne_bytes());
            }
        });
        self.finish(status, || out.fill(0));
        Ok(status)
    }

    fn finish(&self, status: PopStatus, silence: impl FnOnce()) {
        match status {
            PopStatus::Popped => self.stats.record_played(),
            PopStatus::Empty => {
                silence();
                self.stats.record_underrun();
            }
        }
    }

    /// Ring this callback drains
    pub fn ring(&self) -> &Arc<FrameRing> {
        &self.ring
    }
}
