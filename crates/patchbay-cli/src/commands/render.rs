//! Offline rendering of a demo patch to WAV.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_config::PatchFile;
use patchbay_core::{EngineEvent, SynthConfig, Synthesizer};
use patchbay_units::LineOut;

use crate::commands::common::parse_key_val;
use crate::patches::{self, CliWaveform, Patch, PatchParams};
use crate::wav::{peak, write_wav};

#[derive(Args)]
pub struct RenderArgs {
    /// Patch to render
    #[arg(value_enum)]
    patch: Patch,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Patch file with `[engine]` settings and `[[presets]]`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset from the patch file to apply (name or index)
    #[arg(short, long)]
    preset: Option<String>,

    /// Exported port overrides, e.g. `--set osc.Frequency=330`
    #[arg(long = "set", value_parser = parse_key_val)]
    overrides: Vec<(String, f32)>,

    /// Duration in seconds
    #[arg(long, default_value = "2.0")]
    duration: f64,

    /// Gate / sweep length in seconds
    #[arg(long, default_value = "1.0")]
    gate: f64,

    /// Base frequency in Hz
    #[arg(long, default_value = "220.0")]
    freq: f32,

    /// Output amplitude (0-1)
    #[arg(long, default_value = "0.5")]
    amplitude: f32,

    /// Oscillator waveform
    #[arg(long, value_enum, default_value = "saw")]
    waveform: CliWaveform,

    /// Sample rate (overrides the patch file)
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Block size in frames (overrides the patch file)
    #[arg(long)]
    block_size: Option<usize>,

    /// Bits per sample: 16, 24 or 32 (float)
    #[arg(long, default_value = "32")]
    bits: u16,
}

pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    anyhow::ensure!(
        matches!(args.bits, 16 | 24 | 32),
        "unsupported bit depth {} (expected 16, 24 or 32)",
        args.bits
    );
    let file = match &args.config {
        Some(path) => PatchFile::load(path)
            .with_context(|| format!("loading patch file {}", path.display()))?,
        None => PatchFile::default(),
    };
    let mut config: SynthConfig = file.engine;
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate as f32;
    }
    if let Some(block) = args.block_size {
        config.block_size = block;
    }
    config.output_channels = 2;
    patchbay_config::validate_config(&config)?;

    let mut synth = Synthesizer::new(config);
    let params = PatchParams {
        frequency: args.freq,
        amplitude: args.amplitude,
        waveform: args.waveform.into(),
        gate: args.gate,
    };
    let voice = patches::build(&mut synth, args.patch, &params)?;

    let bank = file.bank();
    if !bank.is_empty() {
        bank.install(&mut synth, voice.circuit)?;
    }
    if let Some(preset) = &args.preset {
        let index = match preset.parse::<i64>() {
            Ok(i) => i,
            Err(_) => bank
                .index_of(preset)
                .with_context(|| format!("preset '{preset}' not found"))?
                as i64,
        };
        synth.use_preset(voice.circuit, index)?;
        tracing::info!(preset = %preset, index, "preset applied");
    }
    for (alias, value) in &args.overrides {
        let port = synth
            .port(voice.circuit, alias)
            .with_context(|| format!("no exported port '{alias}'"))?;
        synth.set(port, *value)?;
    }

    let out = synth.add(LineOut::new());
    let line_in = synth.port(out, "Input")?;
    for part in 0..2 {
        synth.connect_parts(voice.output, 0, line_in, part)?;
    }
    for sink in synth.unstarted_sinks() {
        synth.start_unit(sink)?;
    }
    let events = synth.events();
    synth.start();

    let frames = config.seconds_to_frames(args.duration) as usize;
    let channels = config.output_channels;
    let mut samples = vec![0.0_f32; frames * channels];
    println!(
        "Rendering '{}' ({:.2}s at {} Hz, block {})",
        args.patch.name(),
        args.duration,
        config.sample_rate,
        config.block_size
    );
    synth.render(&mut samples);

    for event in events.try_iter() {
        match event {
            EngineEvent::UnitFinished {
                unit,
                disabled,
                frame,
            } => tracing::info!(unit = %unit, ?disabled, frame, "unit finished"),
            EngineEvent::QueueStarved { port, frame } => {
                tracing::warn!(port = %port, frame, "queue starved")
            }
        }
    }

    write_wav(
        &args.output,
        &samples,
        channels as u16,
        config.sample_rate as u32,
        args.bits,
    )
    .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "Wrote {} frames to {} (peak {:.3})",
        frames,
        args.output.display(),
        peak(&samples)
    );
    Ok(())
}
