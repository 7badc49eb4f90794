//! Session configuration
//!
//! Loaded from JSON or built in code; every field has a default so a partial
//! file is enough.

use crate::streaming::{
    clamp_buffer_count, DEFAULT_FRAMES_PER_BUFFER, MAX_FRAMES_PER_BUFFER, SAMPLE_RATE,
};
use crate::{AudioError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Reserved device name that turns audio off
pub const DISABLED_DEVICE_NAME: &str = "none";

/// Which output device a session opens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DeviceSelector {
    /// Host default output device
    #[default]
    Default,
    /// Device with this exact name
    Named(String),
    /// No device: every session operation becomes a no-op
    Disabled,
}

impl DeviceSelector {
    /// Interpret a device name (`""` = default, `"none"` = disabled)
    pub fn from_name(name: &str) -> Self {
        match name {
            "" => DeviceSelector::Default,
            DISABLED_DEVICE_NAME => DeviceSelector::Disabled,
            other => DeviceSelector::Named(other.to_string()),
        }
    }

    /// True for the reserved "no audio" selector
    pub fn is_disabled(&self) -> bool {
        matches!(self, DeviceSelector::Disabled)
    }
}

impl FromStr for DeviceSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(DeviceSelector::from_name(s))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Default => f.write_str("<default>"),
            DeviceSelector::Named(name) => f.write_str(name),
            DeviceSelector::Disabled => f.write_str(DISABLED_DEVICE_NAME),
        }
    }
}

/// Accept buffer sizes in `1..=MAX_FRAMES_PER_BUFFER`
pub(crate) fn check_frames_per_buffer(frames: usize) -> Result<()> {
    if frames == 0 {
        return Err(AudioError::Config(
            "frames_per_buffer must be greater than 0".into(),
        ));
    }
    if frames > MAX_FRAMES_PER_BUFFER {
        return Err(AudioError::Config(format!(
            "frames_per_buffer {frames} exceeds the maximum of {MAX_FRAMES_PER_BUFFER}"
        )));
    }
    Ok(())
}

/// Audio session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name; empty for the host default, `"none"` to disable
    pub device: String,

    /// Requested ring capacity in buffers (clamped to 3..=1024)
    /// Larger rings = more latency but fewer underruns
    pub buffers: usize,

    /// Stereo frames per buffer, fixed for the session
    /// Typical: 256 (≈5ms at 48.8kHz), 1024 on hosts with coarse scheduling
    pub frames_per_buffer: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        AudioConfig {
            device: String::new(),
            buffers: 8,
            frames_per_buffer: DEFAULT_FRAMES_PER_BUFFER,
        }
    }
}

impl AudioConfig {
    /// Parse a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: AudioConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Reject values no session can run with
    pub fn validate(&self) -> Result<()> {
        check_frames_per_buffer(self.frames_per_buffer)
    }

    /// Parsed device selector
    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector::from_name(&self.device)
    }

    /// Ring capacity a session will actually allocate
    pub fn effective_buffer_count(&self) -> usize {
        clamp_buffer_count(self.buffers)
    }

    /// Duration of one buffer in milliseconds
    pub fn buffer_duration_ms(&self) -> f32 {
        (self.frames_per_buffer as f32) / (SAMPLE_RATE as f32) * 1000.0
    }

    /// Worst-case queueing latency in milliseconds (full ring)
    pub fn latency_ms(&self) -> f32 {
        self.effective_buffer_count() as f32 * self.buffer_duration_ms()
    }
}
