//! Three-source output mixer
//!
//! The machine has three sound generators clocked independently of each
//! other: the square/noise generator (PSG), the sample-playback FIFO (PCM)
//! and the FM synthesizer. For every buffer the mixer asks each one for the
//! same number of frames and averages them sample by sample.
//!
//! Averaging instead of summing means three sources peaking together can
//! never clip; a single source playing against two silent ones comes out at
//! a third of its level.

use crate::frame::AudioFrame;

/// A sound generator that can render a buffer of stereo frames
pub trait SoundSource: Send {
    /// Fill `out` with the next `out.frames()` stereo frames
    fn render(&mut self, out: &mut AudioFrame);

    /// Called once per session with the sample rate the device reported
    fn prepare(&mut self, _sample_rate: u32) {}
}

/// A source that only ever produces silence
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SoundSource for Silence {
    fn render(&mut self, out: &mut AudioFrame) {
        out.fill_silence();
    }
}

/// Average three sample streams into `out`, truncating toward zero
///
/// # Panics
/// If the slices differ in length.
#[inline]
pub fn mix_average(a: &[i16], b: &[i16], c: &[i16], out: &mut [i16]) {
    assert!(a.len() == out.len() && b.len() == out.len() && c.len() == out.len());

    for (((dst, &a), &b), &c) in out.iter_mut().zip(a).zip(b).zip(c) {
        // |sum / 3| <= 32768 and only reaches it for three -32768s, which
        // divide exactly, so the result always fits i16
        *dst = ((i32::from(a) + i32::from(b) + i32::from(c)) / 3) as i16;
    }
}

/// Renders and combines the three machine sound sources
pub struct Mixer {
    psg: Box<dyn SoundSource>,
    pcm: Box<dyn SoundSource>,
    fm: Box<dyn SoundSource>,
    scratch: [AudioFrame; 3],
}

impl Mixer {
    /// Create a mixer over the square/noise, sample-playback and FM sources
    pub fn new(
        psg: Box<dyn SoundSource>,
        pcm: Box<dyn SoundSource>,
        fm: Box<dyn SoundSource>,
    ) -> Self {
        Mixer {
            psg,
            pcm,
            fm,
            scratch: [AudioFrame::silent(0), AudioFrame::silent(0), AudioFrame::silent(0)],
        }
    }

    /// Size scratch buffers for `frames` and tell every source the rate
    ///
    /// This is the only place the mixer allocates.
    pub fn prepare(&mut self, sample_rate: u32, frames: usize) {
        for scratch in self.scratch.iter_mut() {
            if scratch.frames() != frames {
                *scratch = AudioFrame::silent(frames);
            }
        }
        self.psg.prepare(sample_rate);
        self.pcm.prepare(sample_rate);
        self.fm.prepare(sample_rate);
    }

    /// Render one buffer from each source and write their average into `out`
    pub fn render(&mut self, out: &mut AudioFrame) {
        if self.scratch[0].frames() != out.frames() {
            // Not prepared for this size; keep going rather than panic
            for scratch in self.scratch.iter_mut() {
                *scratch = AudioFrame::silent(out.frames());
            }
        }

        let [psg_buf, pcm_buf, fm_buf] = &mut self.scratch;
        self.psg.render(psg_buf);
        self.pcm.render(pcm_buf);
        self.fm.render(fm_buf);

        mix_average(
            psg_buf.samples(),
            pcm_buf.samples(),
            fm_buf.samples(),
            out.samples_mut(),
        );
    }

    /// Square/noise generator
    pub fn psg_mut(&mut self) -> &mut dyn SoundSource {
        self.psg.as_mut()
    }

    /// Sample-playback unit
    pub fn pcm_mut(&mut self) -> &mut dyn SoundSource {
        self.pcm.as_mut()
    }

    /// FM synthesizer
    pub fn fm_mut(&mut self) -> &mut dyn SoundSource {
        self.fm.as_mut()
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(Box::new(Silence), Box::new(Silence), Box::new(Silence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn mix_one(a: i16, b: i16, c: i16) -> i16 {
        let mut out = [0i16];
        mix_average(&[a], &[b], &[c], &mut out);
        out[0]
    }

    /// Source producing a constant sample
    struct Constant(i16);

    impl SoundSource for Constant {
        fn render(&mut self, out: &mut AudioFrame) {
            out.samples_mut().fill(self.0);
        }
    }

    /// Source producing a ramp so call order is visible
    struct Ramp(i16);

    impl SoundSource for Ramp {
        fn render(&mut self, out: &mut AudioFrame) {
            for s in out.samples_mut() {
                *s = self.0;
                self.0 = self.0.wrapping_add(3);
            }
        }
    }

    struct RateRecorder(Arc<AtomicU32>);

    impl SoundSource for RateRecorder {
        fn render(&mut self, out: &mut AudioFrame) {
            out.fill_silence();
        }

        fn prepare(&mut self, sample_rate: u32) {
            self.0.store(sample_rate, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_mix_full_scale_positive() {
        assert_eq!(mix_one(32767, 32767, 32767), 32767);
    }

    #[test]
    fn test_mix_full_scale_negative() {
        assert_eq!(mix_one(-32768, -32768, -32768), -32768);
    }

    #[test]
    fn test_mix_average() {
        assert_eq!(mix_one(3, 4, 5), 4);
        assert_eq!(mix_one(300, 0, 0), 100);
    }

    #[test]
    fn test_mix_truncates_toward_zero() {
        assert_eq!(mix_one(1, 1, 0), 0);
        assert_eq!(mix_one(-1, -1, 0), 0);
        assert_eq!(mix_one(-2, -2, 0), -1);
        assert_eq!(mix_one(32767, 32767, 0), 21844);
        assert_eq!(mix_one(-32768, -32768, 0), -21845);
    }

    #[test]
    #[should_panic]
    fn test_mix_rejects_mismatched_lengths() {
        let mut out = [0i16; 2];
        mix_average(&[1, 2], &[1], &[1, 2], &mut out);
    }

    #[test]
    fn test_mixer_render() {
        let mut mixer = Mixer::new(
            Box::new(Constant(300)),
            Box::new(Constant(-600)),
            Box::new(Constant(900)),
        );
        mixer.prepare(48_828, 4);

        let mut out = AudioFrame::silent(4);
        mixer.render(&mut out);
        assert!(out.samples().iter().all(|&s| s == 200));
    }

    #[test]
    fn test_mixer_advances_sources_every_buffer() {
        let mut mixer = Mixer::new(Box::new(Ramp(0)), Box::new(Ramp(0)), Box::new(Ramp(0)));
        mixer.prepare(48_828, 1);

        let mut out = AudioFrame::silent(1);
        mixer.render(&mut out);
        assert_eq!(out.samples(), &[0, 3]);
        mixer.render(&mut out);
        assert_eq!(out.samples(), &[6, 9]);
    }

    #[test]
    fn test_mixer_resizes_when_unprepared() {
        let mut mixer = Mixer::new(Box::new(Constant(3)), Box::new(Constant(3)), Box::new(Constant(3)));
        let mut out = AudioFrame::silent(16);
        mixer.render(&mut out);
        assert!(out.samples().iter().all(|&s| s == 3));
    }

    #[test]
    fn test_prepare_forwards_sample_rate() {
        let rates: Vec<_> = (0..3).map(|_| Arc::new(AtomicU32::new(0))).collect();
        let mut mixer = Mixer::new(
            Box::new(RateRecorder(Arc::clone(&rates[0]))),
            Box::new(RateRecorder(Arc::clone(&rates[1]))),
            Box::new(RateRecorder(Arc::clone(&rates[2]))),
        );
        mixer.prepare(44_100, 256);
        assert!(rates.iter().all(|r| r.load(Ordering::Relaxed) == 44_100));
    }

    #[test]
    fn test_sources_reachable_between_renders() {
        let mut mixer = Mixer::new(
            Box::new(Ramp(0)),
            Box::new(Constant(30)),
            Box::new(Constant(60)),
        );
        mixer.prepare(48_828, 1);

        // Advance the PSG ramp by one buffer outside the mix
        let mut skipped = AudioFrame::silent(1);
        mixer.psg_mut().render(&mut skipped);
        assert_eq!(skipped.samples(), &[0, 3]);

        let mut out = AudioFrame::silent(1);
        mixer.render(&mut out);
        // (6 + 30 + 60) / 3, (9 + 30 + 60) / 3
        assert_eq!(out.samples(), &[32, 33]);

        let mut peek = AudioFrame::silent(1);
        mixer.pcm_mut().render(&mut peek);
        assert_eq!(peek.samples(), &[30, 30]);
        mixer.fm_mut().render(&mut peek);
        assert_eq!(peek.samples(), &[60, 60]);
    }

    #[test]
    fn test_default_mixer_is_silent() {
        let mut mixer = Mixer::default();
        mixer.prepare(48_828, 8);
        let mut out = AudioFrame::from_samples(vec![5; 16]).unwrap();
        mixer.render(&mut out);
        assert_eq!(out, AudioFrame::silent(8));
    }
}
