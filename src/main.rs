//! Demo driver: an emulated 8 MHz processor feeding the audio session
//!
//! Three simple tone generators stand in for the machine's sound chips.
//! Output goes to a real device (feature `streaming`) or, with `--capture`,
//! to a WAV file through the headless backend.

use anyhow::Context;
use clap::Parser;
use log::info;
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use vera_audio::export::WavCapture;
use vera_audio::{
    AudioConfig, AudioFrame, AudioSession, ManualBackend, Mixer, PopStatus, SoundSource,
    StatsSnapshot,
};

/// Emulated processor clock
const CPU_HZ: u32 = 8_000_000;

/// Processor ticks per emulation slice (1 ms)
const CPU_CYCLES_PER_SLICE: u32 = CPU_HZ / 1000;

#[derive(Parser)]
#[command(name = "vera-audio")]
#[command(about = "Pace, mix and play the audio of an emulated machine")]
struct Args {
    /// Output device name, or "none" to disable audio
    #[arg(short, long)]
    device: Option<String>,

    /// Number of ring buffers (clamped to 3..=1024)
    #[arg(short, long)]
    buffers: Option<usize>,

    /// Stereo frames per buffer
    #[arg(long)]
    frames: Option<usize>,

    /// JSON configuration file (command-line flags override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emulated run time in seconds
    #[arg(short, long, default_value_t = 5.0)]
    seconds: f32,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Render offline into this WAV file instead of playing
    #[arg(long)]
    capture: Option<PathBuf>,
}

/// Square wave, standing in for the square/noise generator
struct SquareVoice {
    freq: f32,
    phase: f32,
    step: f32,
}

impl SoundSource for SquareVoice {
    fn prepare(&mut self, sample_rate: u32) {
        self.step = self.freq / sample_rate as f32;
    }

    fn render(&mut self, out: &mut AudioFrame) {
        for frame in out.samples_mut().chunks_exact_mut(2) {
            let s = if self.phase < 0.5 { 8_000 } else { -8_000 };
            frame[0] = s;
            frame[1] = s;
            self.phase = (self.phase + self.step).fract();
        }
    }
}

/// Sawtooth, standing in for the sample-playback unit
struct SawVoice {
    freq: f32,
    phase: f32,
    step: f32,
}

impl SoundSource for SawVoice {
    fn prepare(&mut self, sample_rate: u32) {
        self.step = self.freq / sample_rate as f32;
    }

    fn render(&mut self, out: &mut AudioFrame) {
        for frame in out.samples_mut().chunks_exact_mut(2) {
            let s = ((self.phase * 2.0 - 1.0) * 6_000.0) as i16;
            // Panned hard left
            frame[0] = s;
            frame[1] = 0;
            self.phase = (self.phase + self.step).fract();
        }
    }
}

/// Two-operator FM voice, standing in for the FM synthesizer
struct FmVoice {
    carrier: f32,
    ratio: f32,
    index: f32,
    phase: f32,
    step: f32,
}

impl SoundSource for FmVoice {
    fn prepare(&mut self, sample_rate: u32) {
        self.step = self.carrier / sample_rate as f32;
    }

    fn render(&mut self, out: &mut AudioFrame) {
        for frame in out.samples_mut().chunks_exact_mut(2) {
            let modulator = (TAU * self.phase * self.ratio).sin() * self.index;
            let s = ((TAU * self.phase + modulator).sin() * 10_000.0) as i16;
            frame[0] = s;
            frame[1] = s;
            self.phase = (self.phase + self.step).fract();
        }
    }
}

fn demo_mixer() -> Mixer {
    Mixer::new(
        Box::new(SquareVoice {
            freq: 220.0,
            phase: 0.0,
            step: 0.0,
        }),
        Box::new(SawVoice {
            freq: 330.0,
            phase: 0.0,
            step: 0.0,
        }),
        Box::new(FmVoice {
            carrier: 440.0,
            ratio: 2.0,
            index: 1.5,
            phase: 0.0,
            step: 0.0,
        }),
    )
}

fn build_config(args: &Args) -> anyhow::Result<AudioConfig> {
    let mut config = match &args.config {
        Some(path) => AudioConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AudioConfig::default(),
    };
    if let Some(device) = &args.device {
        config.device = device.clone();
    }
    if let Some(buffers) = args.buffers {
        config.buffers = buffers;
    }
    if let Some(frames) = args.frames {
        config.frames_per_buffer = frames;
    }
    config.validate()?;
    Ok(config)
}

fn slice_count(seconds: f32) -> u64 {
    (seconds.max(0.0) * 1000.0) as u64
}

fn report(stats: &StatsSnapshot) -> anyhow::Result<()> {
    info!("Playback stats: {}", serde_json::to_string(stats)?);
    Ok(())
}

fn run_capture(config: &AudioConfig, path: &Path, seconds: f32) -> anyhow::Result<()> {
    let backend = ManualBackend::new();
    let device = backend.device();
    let mut session = AudioSession::from_config(backend, demo_mixer(), config)?;
    let mut capture = WavCapture::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut buffer = vec![0i16; session.samples_per_buffer()];

    for _ in 0..slice_count(seconds) {
        session.render(CPU_CYCLES_PER_SLICE);
        // Drain everything the slice produced, as a device keeping up would
        while let Some(PopStatus::Popped) = device.pull(&mut buffer)? {
            capture.write(&buffer)?;
        }
    }

    let frames = capture.finalize()?;
    info!("Captured {frames} frames to {}", path.display());
    report(&session.stats())
}

#[cfg(feature = "streaming")]
fn run_realtime(config: &AudioConfig, seconds: f32) -> anyhow::Result<()> {
    use std::time::{Duration, Instant};
    use vera_audio::{RodioBackend, SessionState};

    let mut session = AudioSession::from_config(RodioBackend::new(), demo_mixer(), config)
        .context("Failed to open audio device")?;
    if session.state() == SessionState::Disabled {
        info!("Audio disabled, running emulation silently");
    } else {
        info!("Queue latency up to {:.1} ms", config.latency_ms());
    }

    let start = Instant::now();
    for slice in 0..slice_count(seconds) {
        session.render(CPU_CYCLES_PER_SLICE);
        let deadline = start + Duration::from_millis(slice + 1);
        if let Some(wait) = deadline.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
    }

    report(&session.stats())?;
    session.close();
    Ok(())
}

#[cfg(not(feature = "streaming"))]
fn run_realtime(_config: &AudioConfig, _seconds: f32) -> anyhow::Result<()> {
    anyhow::bail!(
        "Real-time playback requires the \"streaming\" feature. Rebuild with `--features streaming`, or use --capture <file.wav>."
    )
}

#[cfg(feature = "streaming")]
fn list_devices() -> anyhow::Result<()> {
    println!("The following sound output devices are available:");
    for name in vera_audio::list_output_devices()? {
        println!("\t{name}");
    }
    Ok(())
}

#[cfg(not(feature = "streaming"))]
fn list_devices() -> anyhow::Result<()> {
    anyhow::bail!("Device listing requires the \"streaming\" feature")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config = build_config(&args)?;
    if config.selector().is_disabled() && args.capture.is_none() {
        info!("Audio device \"none\" selected");
    }

    match &args.capture {
        Some(path) => run_capture(&config, path, args.seconds),
        None => run_realtime(&config, args.seconds),
    }
}
