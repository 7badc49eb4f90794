//! Ring of pre-allocated frame slots shared by producer and playback thread
//!
//! A ring buffer (circular buffer) allows two threads to operate concurrently:
//! - Producer thread: renders buffers and pushes them into free slots
//! - Consumer thread: pops buffers and copies them into the device region
//!
//! Memory consumption is fixed at `capacity * frames * 2` samples for the whole
//! session. Every slot is allocated up front, so neither push nor pop allocates.
//! Read/write cursors and the fill count live behind one mutex taken exactly
//! once per operation.

use crate::frame::AudioFrame;
use crate::{AudioError, Result};
use parking_lot::lock_api::{Mutex, RawMutex};
use std::fmt;

/// Outcome of [`FrameRing::try_push`]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// Frame was copied into the next free slot
    Pushed,
    /// Every slot is occupied; the frame was not stored
    Full,
}

/// Outcome of [`FrameRing::try_pop_into`]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopStatus {
    /// Oldest frame was copied out and its slot released
    Popped,
    /// Nothing queued; destination left untouched
    Empty,
}

#[derive(Debug)]
struct RingState {
    slots: Vec<AudioFrame>,
    /// Next slot to pop
    read_idx: usize,
    /// Next slot to fill
    write_idx: usize,
    /// Occupied slots, in `[0, slots.len()]`
    count: usize,
}

/// Fixed-capacity FIFO of equally sized audio frames
///
/// # Thread Safety
/// - One producer thread (emulation loop)
/// - One consumer thread (device callback)
/// - Generic over the raw lock so a different mutual-exclusion primitive
///   (e.g. an instrumented one in tests) can stand in for `parking_lot`'s
pub struct FrameRing<R = parking_lot::RawMutex> {
    state: Mutex<R, RingState>,
    capacity: usize,
    frames: usize,
}

impl<R> fmt::Debug for FrameRing<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRing")
            .field("capacity", &self.capacity)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl<R: RawMutex> FrameRing<R> {
    /// Allocate `capacity` slots of `frames` stereo frames each
    ///
    /// The capacity is used as given; session setup clamps it first.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `capacity` or `frames` is 0
    /// - Slot memory cannot be reserved
    pub fn with_capacity(capacity: usize, frames: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(AudioError::Config(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }
        if frames == 0 {
            return Err(AudioError::Config(
                "Frames per buffer must be greater than 0".into(),
            ));
        }

        let alloc_err = |source| AudioError::Allocation {
            slots: capacity,
            samples: frames.saturating_mul(crate::streaming::CHANNELS),
            source,
        };

        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity).map_err(alloc_err)?;
        for _ in 0..capacity {
            slots.push(AudioFrame::try_silent(frames).map_err(alloc_err)?);
        }

        Ok(FrameRing {
            state: Mutex::new(RingState {
                slots,
                read_idx: 0,
                write_idx: 0,
                count: 0,
            }),
            capacity,
            frames,
        })
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stereo frames per slot
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Samples per slot (frames * channels)
    pub fn samples_per_slot(&self) -> usize {
        self.frames * crate::streaming::CHANNELS
    }

    /// Copy `frame` into the next free slot (producer)
    ///
    /// Never blocks on a full ring and never grows it: the caller decides
    /// what to do with a frame that did not fit.
    pub fn try_push(&self, frame: &AudioFrame) -> PushStatus {
        debug_assert_eq!(frame.len(), self.samples_per_slot());

        let mut state = self.state.lock();
        if state.count == self.capacity {
            return PushStatus::Full;
        }

        let idx = state.write_idx;
        state.slots[idx].copy_from(frame);
        state.write_idx = (idx + 1) % self.capacity;
        state.count += 1;
        PushStatus::Pushed
    }

    /// Hand the oldest frame to `f` and release its slot (consumer)
    ///
    /// `f` runs while the lock is held, so it should only copy.
    pub fn try_pop_with<F: FnOnce(&[i16])>(&self, f: F) -> PopStatus {
        let mut state = self.state.lock();
        if state.count == 0 {
            return PopStatus::Empty;
        }

        let idx = state.read_idx;
        f(state.slots[idx].samples());
        state.read_idx = (idx + 1) % self.capacity;
        state.count -= 1;
        PopStatus::Popped
    }

    /// Copy the oldest frame into `dest` and release its slot (consumer)
    ///
    /// # Panics
    /// If `dest` is not exactly one slot long.
    pub fn try_pop_into(&self, dest: &mut [i16]) -> PopStatus {
        self.try_pop_with(|samples| dest.copy_from_slice(samples))
    }

    /// Number of queued frames
    pub fn len(&self) -> usize {
        self.state.lock().count
    }

    /// Check if no frames are queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if every slot is occupied
    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    /// Get fill percentage (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        (self.len() as f32) / (self.capacity as f32)
    }

    /// Drop every queued frame
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.read_idx = state.write_idx;
        state.count = 0;
    }
}
