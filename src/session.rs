//! Audio session: clock pacing, mixing and the device stream in one object
//!
//! A session is `Closed`, `Disabled` (the reserved "none" device was
//! selected) or `Open`. While open, [`AudioSession::render`] runs on the
//! emulation thread and the backend's callback drains the ring on the device
//! thread; the ring is the only state they share.

use crate::backend::{AudioBackend, AudioOutput, StreamSpec};
use crate::clock::ClockAccumulator;
use crate::config::{check_frames_per_buffer, AudioConfig, DeviceSelector};
use crate::frame::AudioFrame;
use crate::mixer::Mixer;
use crate::streaming::{
    clamp_buffer_count, FrameRing, PlaybackCallback, PushStatus, StatsSnapshot, StreamStats,
    CHANNELS, DEFAULT_FRAMES_PER_BUFFER, SAMPLE_RATE,
};
use crate::{AudioError, Result};
use log::{debug, info, trace};
use std::sync::Arc;

/// Lifecycle state of an [`AudioSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No device open
    Closed,
    /// Audio explicitly turned off; every operation is a no-op
    Disabled,
    /// Stream open and callback running
    Open,
}

struct OpenStream {
    output: Box<dyn AudioOutput>,
    ring: Arc<FrameRing>,
    clock: ClockAccumulator,
    /// Mix target, pushed into the ring by copy
    scratch: AudioFrame,
    spec: StreamSpec,
}

/// Owns the ring, clock state and device stream of one audio session
pub struct AudioSession<B: AudioBackend> {
    backend: B,
    mixer: Mixer,
    frames_per_buffer: usize,
    stream: Option<OpenStream>,
    disabled: bool,
    stats: Arc<StreamStats>,
}

impl<B: AudioBackend> AudioSession<B> {
    /// Create a closed session rendering 256-frame buffers
    pub fn new(backend: B, mixer: Mixer) -> Self {
        AudioSession {
            backend,
            mixer,
            frames_per_buffer: DEFAULT_FRAMES_PER_BUFFER,
            stream: None,
            disabled: false,
            stats: Arc::new(StreamStats::default()),
        }
    }

    /// Create a session and open it as `config` describes
    pub fn from_config(backend: B, mixer: Mixer, config: &AudioConfig) -> Result<Self> {
        let mut session = Self::new(backend, mixer).with_frames_per_buffer(config.frames_per_buffer)?;
        session.init(&config.selector(), config.buffers)?;
        Ok(session)
    }

    /// Use `frames` stereo frames per buffer for subsequent sessions
    ///
    /// # Errors
    ///
    /// `frames` is 0 or above [`crate::streaming::MAX_FRAMES_PER_BUFFER`].
    pub fn with_frames_per_buffer(mut self, frames: usize) -> Result<Self> {
        check_frames_per_buffer(frames)?;
        self.frames_per_buffer = frames;
        Ok(self)
    }

    /// Open the output device and start the playback callback
    ///
    /// An already open session is closed first. `requested_buffers` is
    /// clamped to `[3, 1024]`. Selecting the reserved "none" device succeeds
    /// without opening anything and turns every later call into a no-op.
    ///
    /// # Errors
    ///
    /// Slot allocation failure or a device that refuses to open. Both leave
    /// the session closed.
    pub fn init(&mut self, selector: &DeviceSelector, requested_buffers: usize) -> Result<()> {
        if self.state() != SessionState::Closed {
            self.close();
        }

        if selector.is_disabled() {
            info!("Audio output disabled");
            self.disabled = true;
            return Ok(());
        }

        let capacity = clamp_buffer_count(requested_buffers);
        if capacity != requested_buffers {
            debug!("Audio buffer count {requested_buffers} clamped to {capacity}");
        }

        let frames = self.frames_per_buffer;
        let ring = Arc::new(FrameRing::with_capacity(capacity, frames)?);
        let scratch = AudioFrame::try_silent(frames).map_err(|source| AudioError::Allocation {
            slots: 1,
            samples: frames.saturating_mul(CHANNELS),
            source,
        })?;

        self.stats = Arc::new(StreamStats::default());
        let callback = PlaybackCallback::new(Arc::clone(&ring), Arc::clone(&self.stats));
        let output = self
            .backend
            .open(selector, StreamSpec::stereo(SAMPLE_RATE, frames), callback)?;

        let spec = output.spec();
        self.mixer.prepare(spec.sample_rate, frames);
        output.resume();

        info!(
            "Audio device {selector} opened: {} Hz, {} buffers of {frames} frames",
            spec.sample_rate, capacity
        );

        self.stream = Some(OpenStream {
            output,
            ring,
            clock: ClockAccumulator::new(frames),
            scratch,
            spec,
        });
        Ok(())
    }

    /// Stop the callback and release every slot
    ///
    /// Safe to call in any state.
    pub fn close(&mut self) {
        self.disabled = false;
        if let Some(stream) = self.stream.take() {
            let OpenStream { output, ring, .. } = stream;
            // Callback first, so the device thread can no longer reach the ring
            output.close();
            drop(ring);
            info!("Audio device closed");
        }
    }

    /// Advance the audio clock by `cpu_clocks` processor ticks
    ///
    /// Renders and queues every buffer that became due. Buffers that find the
    /// ring full are dropped.
    pub fn render(&mut self, cpu_clocks: u32) {
        let Some(stream) = self.stream.as_mut() else {
            return;
        };

        let due = stream.clock.advance(cpu_clocks);
        for _ in 0..due {
            self.mixer.render(&mut stream.scratch);
            self.stats.record_rendered();

            match stream.ring.try_push(&stream.scratch) {
                PushStatus::Pushed => self.stats.record_queued(),
                PushStatus::Full => {
                    self.stats.record_dropped();
                    trace!("Audio ring full, buffer dropped");
                }
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        if self.stream.is_some() {
            SessionState::Open
        } else if self.disabled {
            SessionState::Disabled
        } else {
            SessionState::Closed
        }
    }

    /// True while a device stream is open
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Counters of the current (or last) session
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stereo frames per buffer
    pub fn frames_per_buffer(&self) -> usize {
        self.frames_per_buffer
    }

    /// Samples per buffer (frames * channels)
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer * CHANNELS
    }

    /// Ring capacity of the open stream
    pub fn capacity(&self) -> Option<usize> {
        self.stream.as_ref().map(|s| s.ring.capacity())
    }

    /// Buffers currently waiting for the device
    pub fn queued(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.ring.len())
    }

    /// Format obtained from the device
    pub fn spec(&self) -> Option<StreamSpec> {
        self.stream.as_ref().map(|s| s.spec)
    }

    /// Clock state of the open stream
    pub fn clock(&self) -> Option<&ClockAccumulator> {
        self.stream.as_ref().map(|s| &s.clock)
    }

    /// Pause the device callback (queued buffers are kept)
    pub fn pause(&self) {
        if let Some(stream) = &self.stream {
            stream.output.pause();
        }
    }

    /// Resume the device callback
    pub fn resume(&self) {
        if let Some(stream) = &self.stream {
            stream.output.resume();
        }
    }

    /// The mixer and its sources
    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    /// The backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: AudioBackend> Drop for AudioSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ManualBackend;
    use crate::streaming::MAX_FRAMES_PER_BUFFER;

    fn session() -> AudioSession<ManualBackend> {
        AudioSession::new(ManualBackend::new(), Mixer::default())
    }

    #[test]
    fn test_starts_closed() {
        let mut s = session();
        assert_eq!(s.state(), SessionState::Closed);
        s.render(1_000_000);
        s.close();
        assert_eq!(s.state(), SessionState::Closed);
    }

    #[test]
    fn test_init_opens_and_resumes() {
        let mut s = session();
        let device = s.backend().device();
        s.init(&DeviceSelector::Default, 8).unwrap();

        assert_eq!(s.state(), SessionState::Open);
        assert_eq!(s.capacity(), Some(8));
        assert!(device.is_open());
        assert!(!device.is_paused());
        assert_eq!(s.spec().unwrap().sample_rate, SAMPLE_RATE);
    }

    #[test]
    fn test_capacity_clamp() {
        for (requested, effective) in [(1, 3), (5000, 1024), (3, 3)] {
            let mut s = session();
            s.init(&DeviceSelector::Default, requested).unwrap();
            assert_eq!(s.capacity(), Some(effective));
        }
    }

    #[test]
    fn test_zero_frames_rejected() {
        assert!(session().with_frames_per_buffer(0).is_err());
    }

    #[test]
    fn test_oversized_frames_rejected() {
        for frames in [MAX_FRAMES_PER_BUFFER + 1, usize::MAX] {
            assert!(matches!(
                session().with_frames_per_buffer(frames),
                Err(AudioError::Config(_))
            ));
        }
        let s = session().with_frames_per_buffer(MAX_FRAMES_PER_BUFFER).unwrap();
        assert_eq!(s.frames_per_buffer(), MAX_FRAMES_PER_BUFFER);
    }

    #[test]
    fn test_from_config_rejects_oversized_frames() {
        // Built in code, so validate() never ran
        let config = AudioConfig {
            frames_per_buffer: usize::MAX,
            ..AudioConfig::default()
        };
        let backend = ManualBackend::new();
        let device = backend.device();
        let result = AudioSession::from_config(backend, Mixer::default(), &config);
        assert!(matches!(result, Err(AudioError::Config(_))));
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn test_render_queues_due_buffers() {
        let mut s = session();
        s.init(&DeviceSelector::Default, 16).unwrap();

        // 20972 conversion steps = 524300 device ticks, just over 4 buffers
        s.render(167_776);
        assert_eq!(s.queued(), 4);
        assert_eq!(s.stats().rendered, 4);
        assert_eq!(s.stats().queued, 4);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut s = session();
        let device = s.backend().device();
        s.init(&DeviceSelector::Default, 3).unwrap();

        s.pause();
        assert!(device.is_paused());
        s.resume();
        assert!(!device.is_paused());
    }
}
