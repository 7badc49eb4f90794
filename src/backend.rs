//! Output backend abstraction
//!
//! A backend opens a stream on some output device and drives a
//! [`PlaybackCallback`] from its own real-time thread. The session only ever
//! talks to these traits, so the whole pipeline runs unchanged against the
//! headless [`ManualBackend`] in tests and offline capture.

use crate::config::DeviceSelector;
use crate::streaming::{PlaybackCallback, PopStatus, CHANNELS};
use crate::{AudioError, Result};
use parking_lot::Mutex;
use std::sync::Arc;

/// Stream format requested from, and reported by, a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of interleaved channels
    pub channels: u16,
    /// Stereo frames per callback invocation
    pub frames_per_buffer: usize,
}

impl StreamSpec {
    /// Signed 16-bit stereo at `sample_rate`
    pub fn stereo(sample_rate: u32, frames_per_buffer: usize) -> Self {
        StreamSpec {
            sample_rate,
            channels: CHANNELS as u16,
            frames_per_buffer,
        }
    }

    /// Duration of one buffer in milliseconds
    pub fn buffer_duration_ms(&self) -> f32 {
        (self.frames_per_buffer as f32) / (self.sample_rate as f32) * 1000.0
    }
}

/// Something that can open output streams
pub trait AudioBackend {
    /// Open a stream on the device named by `selector`
    ///
    /// The stream starts paused; the callback must not fire until
    /// [`AudioOutput::resume`] is called. `selector` is never
    /// [`DeviceSelector::Disabled`]; the session handles that case itself.
    fn open(
        &mut self,
        selector: &DeviceSelector,
        spec: StreamSpec,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn AudioOutput>>;
}

/// An open output stream
pub trait AudioOutput {
    /// Format actually obtained from the device
    fn spec(&self) -> StreamSpec;

    /// Stop invoking the callback (device keeps running)
    fn pause(&self);

    /// Start or restart invoking the callback
    fn resume(&self);

    /// Stop the callback and release the device
    ///
    /// Once this returns the callback is never invoked again, so the ring it
    /// drains can be released.
    fn close(self: Box<Self>);
}

#[derive(Default)]
struct ManualSlot {
    callback: Option<PlaybackCallback>,
    paused: bool,
    /// Callback rejected a region; the stream is dead until reopened
    failed: bool,
    opens: usize,
    selector: Option<DeviceSelector>,
    fail_next_open: Option<String>,
}

/// Handle used to play the part of the hardware audio thread
///
/// Cloneable and `Send`, so a test can hand it to a consumer thread while the
/// session renders on another.
#[derive(Clone, Default)]
pub struct ManualDevice {
    slot: Arc<Mutex<ManualSlot>>,
}

impl ManualDevice {
    /// Invoke the stream callback once, as the device thread would
    ///
    /// Returns `Ok(None)` when no stream is open, it is paused, or an earlier
    /// callback failed; `out` is then left untouched. A callback error ends
    /// the stream: every later pull returns `Ok(None)` until the next open.
    pub fn pull(&self, out: &mut [i16]) -> Result<Option<PopStatus>> {
        self.invoke(|callback| callback.fill(out))
    }

    /// Byte-region variant of [`ManualDevice::pull`]
    pub fn pull_bytes(&self, out: &mut [u8]) -> Result<Option<PopStatus>> {
        self.invoke(|callback| callback.fill_bytes(out))
    }

    fn invoke<F>(&self, f: F) -> Result<Option<PopStatus>>
    where
        F: FnOnce(&mut PlaybackCallback) -> Result<PopStatus>,
    {
        let mut slot = self.slot.lock();
        if slot.paused || slot.failed {
            return Ok(None);
        }
        let Some(callback) = slot.callback.as_mut() else {
            return Ok(None);
        };
        match f(callback) {
            Ok(status) => Ok(Some(status)),
            Err(e) => {
                log::error!("{e}");
                slot.failed = true;
                Err(e)
            }
        }
    }

    /// The open stream was ended by a callback error
    pub fn is_failed(&self) -> bool {
        let slot = self.slot.lock();
        slot.callback.is_some() && slot.failed
    }

    /// A stream is open (paused or not)
    pub fn is_open(&self) -> bool {
        self.slot.lock().callback.is_some()
    }

    /// The open stream is paused
    pub fn is_paused(&self) -> bool {
        let slot = self.slot.lock();
        slot.callback.is_some() && slot.paused
    }

    /// How many streams have been opened on this device
    pub fn open_count(&self) -> usize {
        self.slot.lock().opens
    }

    /// Selector passed to the most recent open
    pub fn last_selector(&self) -> Option<DeviceSelector> {
        self.slot.lock().selector.clone()
    }

    /// Make the next open fail with `message`
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.slot.lock().fail_next_open = Some(message.into());
    }
}

/// Headless backend driven through a [`ManualDevice`]
#[derive(Clone, Default)]
pub struct ManualBackend {
    device: ManualDevice,
}

impl ManualBackend {
    /// Create a backend with no open stream
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for pulling buffers out of whatever stream is open
    pub fn device(&self) -> ManualDevice {
        self.device.clone()
    }
}

impl AudioBackend for ManualBackend {
    fn open(
        &mut self,
        selector: &DeviceSelector,
        spec: StreamSpec,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn AudioOutput>> {
        let mut slot = self.device.slot.lock();
        if let Some(message) = slot.fail_next_open.take() {
            return Err(AudioError::DeviceOpen(message));
        }

        slot.callback = Some(callback);
        slot.paused = true;
        slot.failed = false;
        slot.opens += 1;
        slot.selector = Some(selector.clone());
        drop(slot);

        Ok(Box::new(ManualOutput {
            device: self.device.clone(),
            spec,
        }))
    }
}

struct ManualOutput {
    device: ManualDevice,
    spec: StreamSpec,
}

impl AudioOutput for ManualOutput {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn pause(&self) {
        self.device.slot.lock().paused = true;
    }

    fn resume(&self) {
        self.device.slot.lock().paused = false;
    }

    fn close(self: Box<Self>) {
        let mut slot = self.device.slot.lock();
        slot.callback = None;
        slot.paused = false;
        slot.failed = false;
    }
}
