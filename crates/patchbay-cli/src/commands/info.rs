//! Prints the structure of a demo patch.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use patchbay_config::PatchFile;
use patchbay_core::{PortKind, Synthesizer};

use crate::patches::{self, CliWaveform, Patch, PatchParams};

#[derive(Args)]
pub struct InfoArgs {
    /// Patch to describe
    #[arg(value_enum)]
    patch: Patch,

    /// Patch file whose engine settings and presets are listed
    #[arg(short, long)]
    config: Option<PathBuf>,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let file = match &args.config {
        Some(path) => PatchFile::load(path)
            .with_context(|| format!("loading patch file {}", path.display()))?,
        None => PatchFile::default(),
    };
    let config = file.engine;

    let mut synth = Synthesizer::new(config);
    let params = PatchParams {
        frequency: 220.0,
        amplitude: 0.5,
        waveform: CliWaveform::default().into(),
        gate: 1.0,
    };
    let voice = patches::build(&mut synth, args.patch, &params)?;

    println!("Patch: {} - {}", args.patch.name(), args.patch.description());
    println!();
    println!("Engine");
    println!("  Sample rate:     {} Hz", config.sample_rate);
    println!("  Block size:      {} frames", config.block_size);
    println!("  Output channels: {}", config.output_channels);
    println!();

    println!("Units in '{}'", synth.circuit_name(voice.circuit)?);
    for &unit in synth.children(voice.circuit)? {
        println!("  {:<6} {}", unit.to_string(), synth.type_name(unit)?);
    }
    println!();

    println!("Exported ports");
    for name in synth.port_names(voice.circuit)? {
        let port = synth.port(voice.circuit, &name)?;
        match port.kind() {
            PortKind::Input | PortKind::Variable => {
                let value = synth.get(port)?;
                if port.kind() == PortKind::Input {
                    let range = synth.range(port)?;
                    println!(
                        "  {:<24} {:>10.3}  [{} .. {}]",
                        name, value, range.min, range.max
                    );
                } else {
                    println!("  {:<24} {:>10.3}  (variable)", name, value);
                }
            }
            kind => println!("  {:<24} {:>10}  ({:?})", name, "-", kind),
        }
    }

    let bank = file.bank();
    if !bank.is_empty() {
        println!();
        println!("Presets");
        for (i, preset) in bank.presets.iter().enumerate() {
            match &preset.description {
                Some(desc) => println!("  {i:>2}: {} - {desc}", preset.name),
                None => println!("  {i:>2}: {}", preset.name),
            }
        }
    }
    Ok(())
}
