//! Real-time buffer hand-off between the emulation thread and the device
//!
//! The producer (emulation loop) pushes finished buffers into a [`FrameRing`];
//! the consumer (the device's real-time thread) drains it through a
//! [`PlaybackCallback`]. Both sides take the ring lock once per buffer and
//! never wait on each other.

#[cfg(feature = "streaming")]
pub mod audio_device;
pub mod callback;
pub mod ring_buffer;
pub mod stats;

#[cfg(feature = "streaming")]
pub use audio_device::{list_output_devices, RodioBackend};
pub use callback::PlaybackCallback;
pub use ring_buffer::{FrameRing, PopStatus, PushStatus};
pub use stats::{StatsSnapshot, StreamStats};

/// Output sample rate: 25 MHz device clock / 512 ticks per sample
pub const SAMPLE_RATE: u32 = 25_000_000 / 512;

/// Interleaved stereo
pub const CHANNELS: usize = 2;

/// Default stereo frames per buffer
pub const DEFAULT_FRAMES_PER_BUFFER: usize = 256;

/// Largest buffer a session accepts (about 1.3 s at the native rate)
pub const MAX_FRAMES_PER_BUFFER: usize = 1 << 16;

/// Fewest ring slots a session will run with
pub const MIN_BUFFERS: usize = 3;

/// Most ring slots a session will run with
pub const MAX_BUFFERS: usize = 1024;

/// Clamp a requested ring capacity into `[MIN_BUFFERS, MAX_BUFFERS]`
#[inline]
pub fn clamp_buffer_count(requested: usize) -> usize {
    requested.clamp(MIN_BUFFERS, MAX_BUFFERS)
}
