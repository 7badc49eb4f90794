//! Fixed-size interleaved stereo buffers
//!
//! Every source, every ring slot and every callback region within a session
//! shares the same frame count, so buffers are allocated once and then only
//! copied between.

use crate::streaming::CHANNELS;

/// Bytes per 16-bit sample
pub const BYTES_PER_SAMPLE: usize = std::mem::size_of::<i16>();

/// One buffer of interleaved stereo 16-bit samples (`frames * 2` values)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioFrame {
    samples: Box<[i16]>,
}

impl AudioFrame {
    /// Create a zero-filled buffer holding `frames` stereo frames
    pub fn silent(frames: usize) -> Self {
        AudioFrame {
            samples: vec![0; frames * CHANNELS].into_boxed_slice(),
        }
    }

    /// Like [`AudioFrame::silent`] but reports allocation failure instead of aborting
    ///
    /// A sample count that overflows `usize` is reported as a capacity overflow.
    pub fn try_silent(frames: usize) -> Result<Self, std::collections::TryReserveError> {
        let len = frames.checked_mul(CHANNELS).unwrap_or(usize::MAX);
        let mut samples = Vec::new();
        samples.try_reserve_exact(len)?;
        samples.resize(len, 0);
        Ok(AudioFrame {
            samples: samples.into_boxed_slice(),
        })
    }

    /// Build a buffer from interleaved samples
    ///
    /// Returns `None` when the sample count is odd (not whole stereo frames).
    pub fn from_samples(samples: Vec<i16>) -> Option<Self> {
        if samples.len() % CHANNELS != 0 {
            return None;
        }
        Some(AudioFrame {
            samples: samples.into_boxed_slice(),
        })
    }

    /// Number of stereo frames
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / CHANNELS
    }

    /// Number of individual samples (frames * channels)
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True for a zero-length buffer
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Size of the buffer in bytes as seen by the output device
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.samples.len() * BYTES_PER_SAMPLE
    }

    /// Interleaved samples
    #[inline]
    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Mutable interleaved samples
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [i16] {
        &mut self.samples
    }

    /// Overwrite with silence
    pub fn fill_silence(&mut self) {
        self.samples.fill(0);
    }

    /// Copy another buffer of the same size into this one
    ///
    /// # Panics
    /// If the two buffers differ in length.
    #[inline]
    pub fn copy_from(&mut self, other: &AudioFrame) {
        self.samples.copy_from_slice(&other.samples);
    }
}
