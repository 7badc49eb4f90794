//! Processor clock to render trigger conversion
//!
//! The emulated processor runs at 8 MHz and the video/audio chip at 25 MHz;
//! one output sample takes 512 device ticks, giving 25_000_000 / 512 Hz.
//! Remainders are carried on both conversion steps so the trigger rate never
//! drifts from that target, however irregular the incoming deltas are.

/// Processor ticks per conversion step
pub const CPU_CLOCK_DIVISOR: u64 = 8;

/// Device ticks produced per conversion step
pub const VERA_CLOCK_MULTIPLIER: u64 = 25;

/// Device ticks per output sample
pub const VERA_TICKS_PER_SAMPLE: u64 = 512;

/// Converts processor clock deltas into "render one buffer" triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAccumulator {
    /// Processor ticks not yet converted, always below `CPU_CLOCK_DIVISOR`
    cpu_remainder: u64,
    /// Device ticks not yet consumed by a render, always below `threshold`
    vera_accumulated: u64,
    /// Device ticks per buffer
    threshold: u64,
}

impl ClockAccumulator {
    /// Create an accumulator for buffers of `frames_per_buffer` frames
    pub fn new(frames_per_buffer: usize) -> Self {
        ClockAccumulator {
            cpu_remainder: 0,
            vera_accumulated: 0,
            threshold: VERA_TICKS_PER_SAMPLE.saturating_mul(frames_per_buffer as u64),
        }
    }

    /// Feed `cpu_ticks` processor ticks and return how many buffers are due
    ///
    /// A large delta (e.g. after the emulator was paused) can make several
    /// buffers due at once.
    pub fn advance(&mut self, cpu_ticks: u32) -> u32 {
        self.cpu_remainder += u64::from(cpu_ticks);
        if self.cpu_remainder >= CPU_CLOCK_DIVISOR {
            let steps = self.cpu_remainder / CPU_CLOCK_DIVISOR;
            self.cpu_remainder -= steps * CPU_CLOCK_DIVISOR;
            self.vera_accumulated += steps * VERA_CLOCK_MULTIPLIER;
        }

        if self.threshold == 0 {
            return 0;
        }

        // Bounded by u32::MAX / 8 * 25 / 512, fits in u32
        let triggers = self.vera_accumulated / self.threshold;
        self.vera_accumulated -= triggers * self.threshold;
        triggers as u32
    }

    /// Processor ticks carried into the next call
    pub fn cpu_remainder(&self) -> u64 {
        self.cpu_remainder
    }

    /// Device ticks carried into the next call
    pub fn vera_accumulated(&self) -> u64 {
        self.vera_accumulated
    }

    /// Device ticks per buffer
    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    const FRAMES: usize = 256;

    #[test]
    fn test_no_trigger_below_threshold() {
        let mut clock = ClockAccumulator::new(FRAMES);
        assert_eq!(clock.threshold(), 131_072);
        assert_eq!(clock.advance(7), 0);
        assert_eq!(clock.cpu_remainder(), 7);
        assert_eq!(clock.vera_accumulated(), 0);
    }

    #[test]
    fn test_huge_buffer_never_triggers() {
        let mut clock = ClockAccumulator::new(usize::MAX);
        assert!(clock.threshold() > u64::from(u32::MAX) / 8 * 25);
        assert_eq!(clock.advance(u32::MAX), 0);
    }

    #[test]
    fn test_exact_divisor_converts() {
        let mut clock = ClockAccumulator::new(FRAMES);
        clock.advance(8);
        assert_eq!(clock.cpu_remainder(), 0);
        assert_eq!(clock.vera_accumulated(), 25);
    }

    #[test]
    fn test_remainder_is_carried() {
        let mut clock = ClockAccumulator::new(FRAMES);
        for _ in 0..3 {
            clock.advance(3);
        }
        // 9 ticks: one step converted, one tick carried
        assert_eq!(clock.cpu_remainder(), 1);
        assert_eq!(clock.vera_accumulated(), 25);
    }

    #[test]
    fn test_one_buffer_per_threshold() {
        let mut clock = ClockAccumulator::new(FRAMES);
        // 8 * 512 * 256 / 25 = 41943.04 cpu ticks per buffer
        assert_eq!(clock.advance(41_936), 0);
        assert_eq!(clock.advance(8), 1);
        assert_eq!(clock.vera_accumulated(), 3);
    }

    #[test]
    fn test_burst_fires_multiple_triggers() {
        let mut clock = ClockAccumulator::new(FRAMES);
        // One emulated second at 8 MHz
        let triggers = clock.advance(8_000_000);
        let vera = 8_000_000 / 8 * 25;
        assert_eq!(u64::from(triggers), vera / clock.threshold());
        assert_eq!(clock.vera_accumulated(), vera % clock.threshold());
    }

    #[test]
    fn test_invariants_hold_after_each_step() {
        let mut clock = ClockAccumulator::new(FRAMES);
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..10_000 {
            clock.advance(rng.gen_range(0..200_000));
            assert!(clock.cpu_remainder() < CPU_CLOCK_DIVISOR);
            assert!(clock.vera_accumulated() < clock.threshold());
        }
    }

    #[test]
    fn test_long_run_has_zero_drift() {
        for (seed, frames) in [(1u64, 256usize), (2, 1024), (3, 1), (4, 17)] {
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
            let mut clock = ClockAccumulator::new(frames);
            let mut total_cpu: u128 = 0;
            let mut total_triggers: u128 = 0;

            for _ in 0..50_000 {
                let delta = match rng.gen_range(0..10) {
                    0 => rng.gen_range(0..5_000_000),
                    _ => rng.gen_range(0..64),
                };
                total_cpu += u128::from(delta);
                total_triggers += u128::from(clock.advance(delta));

                let total_vera = (total_cpu / 8) * 25;
                let threshold = 512 * frames as u128;
                assert_eq!(total_triggers, total_vera / threshold);
            }
        }
    }

    #[test]
    fn test_long_run_rate_matches_sample_rate() {
        let mut clock = ClockAccumulator::new(FRAMES);
        let mut triggers = 0u64;
        // 100 emulated seconds in 1 ms slices
        for _ in 0..100_000 {
            triggers += u64::from(clock.advance(8_000));
        }
        let samples = triggers * FRAMES as u64 + clock.vera_accumulated() / 512;
        assert_eq!(samples, 25_000_000 * 100 / 512);
    }
}
