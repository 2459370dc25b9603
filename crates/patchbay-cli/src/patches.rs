//! Demo patches the renderer can build.
//!
//! Each patch is a circuit named `voice` whose child ports are exported
//! under a prefix (`osc.Frequency`, `env.Attack`, ...), so preset banks and
//! `--set` overrides can address them.

use clap::ValueEnum;
use patchbay_core::{PortId, Synthesizer, UnitGenerator, UnitId};
use patchbay_units::{
    BiquadFilter, EnvelopeDahdsr, GrainFarm, LinearRamp, Mixer, Oscillator, Response,
    SpectralFft, SpectralIfft, Waveform, WhiteNoise,
};

/// Oscillator shapes selectable from the command line.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliWaveform {
    #[default]
    Sine,
    Saw,
    Square,
    Triangle,
    Pulse,
}

impl From<CliWaveform> for Waveform {
    fn from(w: CliWaveform) -> Self {
        match w {
            CliWaveform::Sine => Waveform::Sine,
            CliWaveform::Saw => Waveform::Sawtooth,
            CliWaveform::Square => Waveform::Square,
            CliWaveform::Triangle => Waveform::Triangle,
            CliWaveform::Pulse => Waveform::Pulse,
        }
    }
}

/// Available patches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Patch {
    /// Plain oscillator
    Tone,
    /// Oscillator shaped by a DAHDSR envelope, released after `--gate`
    Pluck,
    /// Oscillator through a resonant low-pass swept by a linear ramp
    Sweep,
    /// Major triad through a three-channel mixer
    Chord,
    /// Granular cloud of sine grains
    Grains,
    /// White noise through an FFT → IFFT round trip
    Spectral,
}

impl Patch {
    /// Every patch, in listing order.
    pub const ALL: [Patch; 6] = [
        Patch::Tone,
        Patch::Pluck,
        Patch::Sweep,
        Patch::Chord,
        Patch::Grains,
        Patch::Spectral,
    ];

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Patch::Tone => "tone",
            Patch::Pluck => "pluck",
            Patch::Sweep => "sweep",
            Patch::Chord => "chord",
            Patch::Grains => "grains",
            Patch::Spectral => "spectral",
        }
    }

    /// One-line description.
    pub fn description(self) -> &'static str {
        match self {
            Patch::Tone => "plain oscillator",
            Patch::Pluck => "oscillator with DAHDSR envelope and auto-disable",
            Patch::Sweep => "oscillator through a ramped resonant low-pass",
            Patch::Chord => "major triad through a mixer",
            Patch::Grains => "granular cloud of sine grains",
            Patch::Spectral => "noise through FFT and IFFT",
        }
    }
}

/// Parameters shared by every patch.
#[derive(Debug, Clone, Copy)]
pub struct PatchParams {
    /// Base frequency in Hz.
    pub frequency: f32,
    /// Output amplitude.
    pub amplitude: f32,
    /// Oscillator shape.
    pub waveform: Waveform,
    /// Seconds until the gate (or ramp) ends.
    pub gate: f64,
}

/// A built patch: the circuit and the mono port to listen to.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    /// Circuit holding the patch's units.
    pub circuit: UnitId,
    /// Signal output.
    pub output: PortId,
}

/// Adds `unit` to `circuit` and exports its ports as `prefix.Name`.
fn child(
    synth: &mut Synthesizer,
    circuit: UnitId,
    prefix: &str,
    unit: impl UnitGenerator,
) -> anyhow::Result<UnitId> {
    let id = synth.add(unit);
    synth.add_to_circuit(circuit, id)?;
    synth.export(circuit, id, &format!("{prefix}."))?;
    Ok(id)
}

fn oscillator(
    synth: &mut Synthesizer,
    circuit: UnitId,
    prefix: &str,
    params: &PatchParams,
    frequency: f32,
    amplitude: f32,
) -> anyhow::Result<UnitId> {
    let osc = child(synth, circuit, prefix, Oscillator::new(params.waveform))?;
    synth.set(synth.port(osc, "Frequency")?, frequency)?;
    synth.set(synth.port(osc, "Amplitude")?, amplitude)?;
    synth.set(synth.port(osc, "Width")?, 0.25)?;
    Ok(osc)
}

/// Builds `patch` inside a new `voice` circuit.
pub fn build(synth: &mut Synthesizer, patch: Patch, params: &PatchParams) -> anyhow::Result<Voice> {
    let circuit = synth.add_circuit("voice");
    let gate_frame = synth.config().seconds_to_frames(params.gate);

    let output = match patch {
        Patch::Tone => {
            let osc = oscillator(synth, circuit, "osc", params, params.frequency, params.amplitude)?;
            synth.port(osc, "Output")?
        }
        Patch::Pluck => {
            let osc = oscillator(synth, circuit, "osc", params, params.frequency, 0.0)?;
            let env = child(synth, circuit, "env", EnvelopeDahdsr::new())?;
            synth.set(synth.port(env, "Attack")?, 0.005)?;
            synth.set(synth.port(env, "Decay")?, 0.3)?;
            synth.set(synth.port(env, "Sustain")?, 0.4)?;
            synth.set(synth.port(env, "Release")?, 0.5)?;
            synth.set(synth.port(env, "Amplitude")?, params.amplitude)?;
            synth.connect(synth.port(env, "Output")?, synth.port(osc, "Amplitude")?)?;

            let gate = synth.port(env, "Input")?;
            synth.set(gate, 1.0)?;
            synth.set_at(gate, 0.0, gate_frame)?;
            synth.set_auto_disable(gate, Some(osc))?;
            synth.port(osc, "Output")?
        }
        Patch::Sweep => {
            let osc = oscillator(synth, circuit, "osc", params, params.frequency, params.amplitude)?;
            let filter = child(synth, circuit, "filter", BiquadFilter::new(Response::LowPass))?;
            let ramp = child(synth, circuit, "cutoff", LinearRamp::new())?;
            synth.set(synth.port(filter, "Q")?, 6.0)?;
            synth.set(synth.port(ramp, "Current")?, 150.0)?;
            synth.set(synth.port(ramp, "Time")?, params.gate as f32)?;
            synth.set(synth.port(ramp, "Input")?, 6000.0)?;
            synth.connect(synth.port(ramp, "Output")?, synth.port(filter, "Frequency")?)?;
            synth.connect(synth.port(osc, "Output")?, synth.port(filter, "Input")?)?;
            synth.port(filter, "Output")?
        }
        Patch::Chord => {
            let mixer = child(synth, circuit, "mix", Mixer::new(3))?;
            let mix_in = synth.port(mixer, "Input")?;
            let ratios = [1.0, 5.0 / 4.0, 3.0 / 2.0];
            for (i, ratio) in ratios.into_iter().enumerate() {
                let osc = oscillator(
                    synth,
                    circuit,
                    &format!("osc{}", i + 1),
                    params,
                    params.frequency * ratio,
                    1.0,
                )?;
                synth.connect_parts(synth.port(osc, "Output")?, 0, mix_in, i)?;
            }
            synth.set(synth.port(mixer, "Amplitude")?, params.amplitude / 3.0)?;
            synth.port(mixer, "Output")?
        }
        Patch::Grains => {
            let farm = child(synth, circuit, "grains", GrainFarm::new().with_seed(0x5eed))?;
            synth.set(synth.port(farm, "Frequency")?, params.frequency)?;
            synth.set(synth.port(farm, "Amplitude")?, params.amplitude)?;
            synth.set(synth.port(farm, "Duration")?, 0.08)?;
            synth.set(synth.port(farm, "Density")?, 0.7)?;
            synth.set(synth.port(farm, "AmplitudeRange")?, 0.5)?;
            synth.set(synth.port(farm, "RateRange")?, 0.05)?;
            synth.port(farm, "Output")?
        }
        Patch::Spectral => {
            let noise = child(synth, circuit, "noise", WhiteNoise::new(7))?;
            let fft = child(synth, circuit, "fft", SpectralFft::default())?;
            let ifft = child(synth, circuit, "ifft", SpectralIfft::default())?;
            synth.set(synth.port(noise, "Amplitude")?, params.amplitude)?;
            synth.connect(synth.port(noise, "Output")?, synth.port(fft, "Input")?)?;
            synth.connect(synth.port(fft, "Spectrum")?, synth.port(ifft, "Spectrum")?)?;
            synth.port(ifft, "Output")?
        }
    };

    tracing::debug!(patch = patch.name(), circuit = %circuit, "patch built");
    Ok(Voice { circuit, output })
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchbay_core::SynthConfig;

    fn params() -> PatchParams {
        PatchParams {
            frequency: 220.0,
            amplitude: 0.5,
            waveform: Waveform::Sawtooth,
            gate: 0.05,
        }
    }

    #[test]
    fn every_patch_builds_and_exports_ports() {
        for patch in Patch::ALL {
            let mut synth = Synthesizer::new(SynthConfig::default());
            let voice = build(&mut synth, patch, &params()).unwrap();
            let names = synth.port_names(voice.circuit).unwrap();
            assert!(names.iter().all(|n| n.contains('.')), "{patch:?}: {names:?}");
            assert!(!names.is_empty());
        }
    }

    #[test]
    fn names_match_clap_values() {
        for patch in Patch::ALL {
            assert_eq!(Patch::from_str(patch.name(), true).unwrap(), patch);
        }
    }
}
