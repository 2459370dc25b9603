//! Sample-wise arithmetic and mixing.

use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

/// `Output = InputA + InputB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Add {
    /// Input index of `InputA`.
    pub const INPUT_A: usize = 0;
    /// Input index of `InputB`.
    pub const INPUT_B: usize = 1;
    /// Output index.
    pub const OUTPUT: usize = 0;
}

impl UnitGenerator for Add {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("InputA", PortRange::SIGNAL)
            .input("InputB", PortRange::SIGNAL)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let a = io.inputs.values(Self::INPUT_A);
        let b = io.inputs.values(Self::INPUT_B);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = a[i] + b[i];
        }
    }
}

/// `Output = InputA * InputB`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Multiply;

impl Multiply {
    /// Input index of `InputA`.
    pub const INPUT_A: usize = 0;
    /// Input index of `InputB`.
    pub const INPUT_B: usize = 1;
    /// Output index.
    pub const OUTPUT: usize = 0;
}

impl UnitGenerator for Multiply {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("InputA", PortRange::SIGNAL)
            .input("InputB", PortRange::new(-1.0, 1.0, 1.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let a = io.inputs.values(Self::INPUT_A);
        let b = io.inputs.values(Self::INPUT_B);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = a[i] * b[i];
        }
    }
}

/// `Output = InputA * InputB + InputC`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiplyAdd;

impl MultiplyAdd {
    /// Input index of `InputA`.
    pub const INPUT_A: usize = 0;
    /// Input index of `InputB`.
    pub const INPUT_B: usize = 1;
    /// Input index of `InputC`.
    pub const INPUT_C: usize = 2;
    /// Output index.
    pub const OUTPUT: usize = 0;
}

impl UnitGenerator for MultiplyAdd {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("InputA", PortRange::SIGNAL)
            .input("InputB", PortRange::new(-1.0, 1.0, 1.0))
            .input("InputC", PortRange::SIGNAL)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let a = io.inputs.values(Self::INPUT_A);
        let b = io.inputs.values(Self::INPUT_B);
        let c = io.inputs.values(Self::INPUT_C);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = a[i].mul_add(b[i], c[i]);
        }
    }
}

/// Copies `Input` to `Output`. Useful as a fan-in point exported from a
/// circuit.
#[derive(Debug, Clone, Copy)]
pub struct PassThrough {
    parts: usize,
}

impl PassThrough {
    /// Input index.
    pub const INPUT: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Mono pass-through.
    pub fn new() -> Self {
        Self { parts: 1 }
    }

    /// Pass-through with `parts` channels.
    pub fn with_parts(parts: usize) -> Self {
        Self {
            parts: parts.max(1),
        }
    }
}

impl Default for PassThrough {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitGenerator for PassThrough {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input_parts("Input", self.parts, PortRange::SIGNAL)
            .output_parts("Output", self.parts)
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        for p in 0..self.parts {
            let input = io.inputs.part(Self::INPUT, p);
            io.outputs.part_mut(Self::OUTPUT, p)[start..limit]
                .copy_from_slice(&input[start..limit]);
        }
    }
}

/// N-channel mixer.
///
/// `Input` and `Gain` have one part per channel; `Output = Amplitude *
/// Σ Input[c] * Gain[c]`.
///
/// ```rust
/// use patchbay_core::{SynthConfig, Synthesizer};
/// use patchbay_units::Mixer;
///
/// let mut synth = Synthesizer::new(SynthConfig::default());
/// let mix = synth.add(Mixer::new(4));
/// let gain = synth.port(mix, "Gain")?;
/// synth.set_part(gain, 3, 0.25)?;
/// # Ok::<(), patchbay_core::GraphError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Mixer {
    channels: usize,
}

impl Mixer {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Gain`.
    pub const GAIN: usize = 1;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 2;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Mixer with `channels` inputs (at least one).
    pub fn new(channels: usize) -> Self {
        Self {
            channels: channels.max(1),
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl UnitGenerator for Mixer {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input_parts("Input", self.channels, PortRange::SIGNAL)
            .input_parts("Gain", self.channels, PortRange::new(0.0, 1.0, 2.0))
            .input("Amplitude", PortRange::new(0.0, 1.0, 2.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let inputs = io.inputs;
        let out = io.outputs.values_mut(Self::OUTPUT);
        out[start..limit].fill(0.0);
        for c in 0..self.channels {
            let input = inputs.part(Self::INPUT, c);
            let gain = inputs.part(Self::GAIN, c);
            for i in start..limit {
                out[i] += input[i] * gain[i];
            }
        }
        let amplitude = inputs.values(Self::AMPLITUDE);
        for i in start..limit {
            out[i] *= amplitude[i];
        }
    }
}
