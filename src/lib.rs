//! Clock-paced audio output for an emulated 8-bit machine
//!
//! Converts emulated processor clock ticks into fixed-size stereo buffers,
//! mixes three independently clocked sound sources (square/noise generator,
//! sample-playback unit and FM synthesizer) and hands finished buffers to a
//! real-time playback callback through a lock-protected ring of
//! pre-allocated frames.
//!
//! # Pipeline
//! ```text
//! cpu ticks -> ClockAccumulator -> triggers -> Mixer -> FrameRing::try_push (drop on full)
//!                                                            |
//!                       hardware <- PlaybackCallback::fill <-+ (silence on empty)
//! ```
//!
//! Neither side ever waits on the other: the producer drops the newest buffer
//! when the ring is full and the consumer emits silence when it is empty.
//!
//! # Crate feature flags
//! - `streaming` (opt-in): real-time output through rodio (`RodioBackend`)
//!
//! # Quick start
//! ```
//! use vera_audio::{AudioSession, DeviceSelector, ManualBackend, Mixer, Silence};
//!
//! let backend = ManualBackend::new();
//! let device = backend.device();
//! let mixer = Mixer::new(Box::new(Silence), Box::new(Silence), Box::new(Silence));
//! let mut session = AudioSession::new(backend, mixer);
//!
//! session.init(&DeviceSelector::Default, 8).unwrap();
//! session.render(8_000_000); // one emulated second
//!
//! let mut out = vec![0i16; session.samples_per_buffer()];
//! device.pull(&mut out).unwrap();
//! session.close();
//! ```

#![warn(missing_docs)]

pub mod backend; // Output backend abstraction
pub mod clock; // Processor clock -> render trigger conversion
pub mod config; // Session configuration
pub mod export; // WAV capture
pub mod frame; // Fixed-size stereo buffers
pub mod mixer; // Three-source mixing
pub mod session; // Session state machine
pub mod streaming; // Ring buffer, playback callback and device adapters

/// Error types for audio pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum AudioError {
    /// Frame slot memory could not be reserved
    #[error("Cannot allocate audio buffers ({slots} slots of {samples} samples): {source}")]
    Allocation {
        /// Number of slots requested
        slots: usize,
        /// Samples per slot
        samples: usize,
        /// Underlying reservation failure
        #[source]
        source: std::collections::TryReserveError,
    },

    /// The output device refused to open
    #[error("Audio device open failed: {0}")]
    DeviceOpen(String),

    /// No output device matches the requested name
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// The playback callback was asked for a region of the wrong size
    #[error("Audio buffer size mismatch! (expected: {expected}, got: {got})")]
    CallbackLength {
        /// Expected length in bytes
        expected: usize,
        /// Requested length in bytes
        got: usize,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// WAV capture failed
    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for audio pipeline operations
pub type Result<T> = std::result::Result<T, AudioError>;

// Public API exports
pub use backend::{AudioBackend, AudioOutput, ManualBackend, ManualDevice, StreamSpec};
pub use clock::ClockAccumulator;
pub use config::{AudioConfig, DeviceSelector};
pub use frame::AudioFrame;
pub use mixer::{mix_average, Mixer, Silence, SoundSource};
pub use session::{AudioSession, SessionState};
pub use streaming::{
    FrameRing, PlaybackCallback, PopStatus, PushStatus, StatsSnapshot, StreamStats,
};
#[cfg(feature = "streaming")]
pub use streaming::{list_output_devices, RodioBackend};
