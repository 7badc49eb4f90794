//! WAV capture of the mixed output
//!
//! Writes buffers exactly as the device would receive them: interleaved
//! stereo, signed 16-bit, at the session sample rate.

use crate::streaming::{CHANNELS, SAMPLE_RATE};
use crate::Result;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Streams mixed buffers into a WAV file
pub struct WavCapture {
    writer: WavWriter<BufWriter<File>>,
    frames_written: u64,
}

impl WavCapture {
    /// Create `path` for 16-bit stereo at the native output rate
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_rate(path, SAMPLE_RATE)
    }

    /// Create `path` for 16-bit stereo at `sample_rate`
    pub fn create_with_rate<P: AsRef<Path>>(path: P, sample_rate: u32) -> Result<Self> {
        let spec = WavSpec {
            channels: CHANNELS as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        Ok(WavCapture {
            writer: WavWriter::create(path, spec)?,
            frames_written: 0,
        })
    }

    /// Append interleaved stereo samples
    pub fn write(&mut self, samples: &[i16]) -> Result<()> {
        for &sample in samples {
            self.writer.write_sample(sample)?;
        }
        self.frames_written += (samples.len() / CHANNELS) as u64;
        Ok(())
    }

    /// Stereo frames written so far
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Flush and patch the header
    pub fn finalize(self) -> Result<u64> {
        let frames = self.frames_written;
        self.writer.finalize()?;
        Ok(frames)
    }
}
