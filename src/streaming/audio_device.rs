//! Audio device integration using rodio
//!
//! rodio pulls samples one at a time from a `Source`; the adapter below
//! invokes the [`PlaybackCallback`] once per whole buffer and hands the
//! samples out of a local copy, so the ring lock is taken once per buffer.

use super::PlaybackCallback;
use crate::backend::{AudioBackend, AudioOutput, StreamSpec};
use crate::config::DeviceSelector;
use crate::{AudioError, Result};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, Sink, Source};
use std::time::Duration;

/// Names of the output devices the default host exposes
pub fn list_output_devices() -> Result<Vec<String>> {
    let host = rodio::cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceOpen(format!("Failed to enumerate devices: {e}")))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

fn find_output_device(name: &str) -> Result<rodio::Device> {
    let host = rodio::cpal::default_host();
    let mut devices = host
        .output_devices()
        .map_err(|e| AudioError::DeviceOpen(format!("Failed to enumerate devices: {e}")))?;
    devices
        .find(|d| d.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

/// Audio source that pulls whole buffers through the playback callback
struct CallbackSource {
    callback: PlaybackCallback,
    spec: StreamSpec,
    /// One buffer, refilled when exhausted
    buffer: Vec<i16>,
    buffer_pos: usize,
    failed: bool,
}

impl CallbackSource {
    fn new(callback: PlaybackCallback, spec: StreamSpec) -> Self {
        let len = callback.expected_samples();
        CallbackSource {
            callback,
            spec,
            buffer: vec![0; len],
            buffer_pos: len, // Start by pulling a buffer
            failed: false,
        }
    }
}

impl Iterator for CallbackSource {
    type Item = i16;

    fn next(&mut self) -> Option<i16> {
        if self.failed {
            return None;
        }

        if self.buffer_pos >= self.buffer.len() {
            if let Err(e) = self.callback.fill(&mut self.buffer) {
                // Misconfigured stream; end it rather than play garbage
                log::error!("{e}");
                self.failed = true;
                return None;
            }
            self.buffer_pos = 0;
        }

        let sample = self.buffer[self.buffer_pos];
        self.buffer_pos += 1;
        Some(sample)
    }
}

impl Source for CallbackSource {
    fn current_frame_len(&self) -> Option<usize> {
        let remaining = self.buffer.len() - self.buffer_pos.min(self.buffer.len());
        if remaining > 0 {
            Some(remaining)
        } else {
            Some(self.buffer.len())
        }
    }

    fn channels(&self) -> u16 {
        self.spec.channels
    }

    fn sample_rate(&self) -> u32 {
        self.spec.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

/// Backend playing through the host audio system via rodio
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioBackend;

impl RodioBackend {
    /// Create the backend
    pub fn new() -> Self {
        RodioBackend
    }
}

impl AudioBackend for RodioBackend {
    fn open(
        &mut self,
        selector: &DeviceSelector,
        spec: StreamSpec,
        callback: PlaybackCallback,
    ) -> Result<Box<dyn AudioOutput>> {
        let (stream, stream_handle) = match selector {
            DeviceSelector::Named(name) => {
                let device = find_output_device(name)?;
                OutputStream::try_from_device(&device)
            }
            _ => OutputStream::try_default(),
        }
        .map_err(|e| AudioError::DeviceOpen(format!("Failed to create audio stream: {e}")))?;

        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| AudioError::DeviceOpen(format!("Failed to create audio sink: {e}")))?;

        // Opened paused; the session resumes once everything is in place
        sink.pause();
        sink.append(CallbackSource::new(callback, spec));

        Ok(Box::new(RodioOutput {
            _stream: stream,
            sink,
            spec,
        }))
    }
}

struct RodioOutput {
    _stream: OutputStream,
    sink: Sink,
    spec: StreamSpec,
}

impl AudioOutput for RodioOutput {
    fn spec(&self) -> StreamSpec {
        self.spec
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn resume(&self) {
        self.sink.play();
    }

    fn close(self: Box<Self>) {
        self.sink.pause();
        self.sink.stop();
        // Dropping the stream tears down the device thread
        drop(self);
    }
}
