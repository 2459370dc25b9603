//! Control smoothing.

use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

/// Glides linearly to the value of `Input` over `Time` seconds.
///
/// A change of `Input` starts a new ramp from the current value; the ramp
/// duration is sampled when it starts. The value is mirrored into the
/// `Current` variable, which the host may also set to jump.
#[derive(Debug, Clone)]
pub struct LinearRamp {
    sample_rate: f32,
    target: f32,
    increment: f32,
    remaining: u32,
}

impl LinearRamp {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Time`.
    pub const TIME: usize = 1;
    /// Variable index of `Current`.
    pub const CURRENT: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Creates a ramp resting at 0.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            target: 0.0,
            increment: 0.0,
            remaining: 0,
        }
    }
}

impl Default for LinearRamp {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitGenerator for LinearRamp {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .input("Time", PortRange::seconds(0.1))
            .variable("Current", 0.0)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let input = io.inputs.values(Self::INPUT);
        let time = io.inputs.values(Self::TIME);
        let out = io.outputs.values_mut(Self::OUTPUT);
        let mut current = io.variables.get(Self::CURRENT);

        for i in start..limit {
            if input[i] != self.target {
                self.target = input[i];
                let frames = (time[i].max(0.0) * self.sample_rate) as u32;
                if frames == 0 {
                    current = self.target;
                    self.remaining = 0;
                } else {
                    self.increment = (self.target - current) / frames as f32;
                    self.remaining = frames;
                }
            }
            if self.remaining > 0 {
                self.remaining -= 1;
                current = if self.remaining == 0 {
                    self.target
                } else {
                    current + self.increment
                };
            }
            out[i] = current;
        }
        io.variables.set(Self::CURRENT, current);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        self.remaining = 0;
    }
}
