//! Audio-rate oscillators.
//!
//! [`Oscillator`] is one unit with a pluggable [`Waveform`]; discontinuous
//! shapes are band-limited with a 4th-order PolyBLEP correction.
//! [`WhiteNoise`] is a seeded noise source.

use core::f32::consts::PI;

use libm::{floorf, sinf};
use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

use crate::rng::Xorshift32;

#[inline]
fn wrap_unit(x: f32) -> f32 {
    x - floorf(x)
}

/// Shape produced by an [`Oscillator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Waveform {
    /// Pure fundamental.
    #[default]
    Sine,
    /// Rising ramp, PolyBLEP at the wrap.
    Sawtooth,
    /// 50% duty square, PolyBLEP at both edges.
    Square,
    /// Symmetric triangle. Only the slope is discontinuous, so it is left
    /// uncorrected.
    Triangle,
    /// Square with duty cycle taken from the `Width` input.
    Pulse,
    /// One full-scale sample per cycle.
    Impulse,
}

impl Waveform {
    /// Sample at `phase` in `[0, 1)`. `dt` is the phase increment; `width`
    /// the pulse duty cycle; `wrapped` is true on the first frame of a cycle.
    #[inline]
    fn sample(self, phase: f32, dt: f32, width: f32, wrapped: bool) -> f32 {
        match self {
            Waveform::Sine => sinf(phase * 2.0 * PI),
            Waveform::Sawtooth => 2.0 * phase - 1.0 - poly_blep(phase, dt),
            Waveform::Square => pulse(phase, 0.5, dt),
            Waveform::Pulse => pulse(phase, width.clamp(0.01, 0.99), dt),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Impulse => {
                if wrapped {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[inline]
fn pulse(phase: f32, duty: f32, dt: f32) -> f32 {
    let naive = if phase < duty { 1.0 } else { -1.0 };
    naive + poly_blep(phase, dt) - poly_blep(wrap_unit(phase - duty + 1.0), dt)
}

/// 4th-order PolyBLEP residual, two samples either side of a step.
///
/// `t` is the phase in `[0, 1)`, `dt` the phase increment. Returns 0 away
/// from the discontinuity.
#[inline]
fn poly_blep(t: f32, dt: f32) -> f32 {
    const A4: f32 = -43.0 / 48.0;
    const A3: f32 = 7.0 / 6.0;
    const A2: f32 = 0.5;
    const A0: f32 = -1.0;
    const C: f32 = -11.0 / 48.0;

    #[inline]
    fn residual(n: f32) -> f32 {
        if n < 1.0 {
            let n2 = n * n;
            A4 * n2 * n2 + A3 * n2 * n + A2 * n2 + A0
        } else {
            let u = 2.0 - n;
            let u2 = u * u;
            C * u2 * u2
        }
    }

    if dt <= 0.0 {
        return 0.0;
    }
    let window = 2.0 * dt;
    if t < window {
        residual(t / dt)
    } else if t > 1.0 - window {
        -residual((1.0 - t) / dt)
    } else {
        0.0
    }
}

/// Periodic oscillator.
///
/// | Port | Kind | Notes |
/// |------|------|-------|
/// | `Frequency` | input | Hz, default 440 |
/// | `Amplitude` | input | default 0.5 |
/// | `Width` | input | pulse duty cycle, default 0.5 |
/// | `Phase` | variable | cycle position in `[0, 1)` |
/// | `Output` | output | |
///
/// ```rust
/// use patchbay_core::{SynthConfig, Synthesizer};
/// use patchbay_units::{Oscillator, Waveform};
///
/// let mut synth = Synthesizer::new(SynthConfig::default());
/// let osc = synth.add(Oscillator::new(Waveform::Sawtooth));
/// synth.set(synth.port(osc, "frequency")?, 110.0)?;
/// # Ok::<(), patchbay_core::GraphError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    sample_rate: f32,
}

impl Oscillator {
    /// Input index of `Frequency`.
    pub const FREQUENCY: usize = 0;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 1;
    /// Input index of `Width`.
    pub const WIDTH: usize = 2;
    /// Variable index of `Phase`.
    pub const PHASE: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Creates an oscillator with the given shape.
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            sample_rate: 48000.0,
        }
    }

    /// Sine oscillator.
    pub fn sine() -> Self {
        Self::new(Waveform::Sine)
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Switches waveform; phase is kept.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::sine()
    }
}

impl UnitGenerator for Oscillator {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Frequency", PortRange::FREQUENCY)
            .input("Amplitude", PortRange::AMPLITUDE)
            .input("Width", PortRange::new(0.0, 0.5, 1.0))
            .variable("Phase", 0.0)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let frequency = io.inputs.values(Self::FREQUENCY);
        let amplitude = io.inputs.values(Self::AMPLITUDE);
        let width = io.inputs.values(Self::WIDTH);
        let out = io.outputs.values_mut(Self::OUTPUT);
        let mut phase = wrap_unit(io.variables.get(Self::PHASE));
        let inv_rate = 1.0 / self.sample_rate;

        for i in start..limit {
            let dt = frequency[i].abs() * inv_rate;
            let wrapped = phase < dt;
            let value = self.waveform.sample(phase, dt, width[i], wrapped);
            out[i] = value * amplitude[i];
            phase += dt;
            if phase >= 1.0 {
                phase = wrap_unit(phase);
            }
        }
        io.variables.set(Self::PHASE, phase);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }
}

/// Uniform white noise in `[-amplitude, amplitude)`.
#[derive(Debug, Clone, Default)]
pub struct WhiteNoise {
    rng: Xorshift32,
}

impl WhiteNoise {
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Noise with a fixed seed.
    pub fn new(seed: u32) -> Self {
        Self {
            rng: Xorshift32::new(seed),
        }
    }
}

impl UnitGenerator for WhiteNoise {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Amplitude", PortRange::AMPLITUDE)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let amplitude = io.inputs.values(Self::AMPLITUDE);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = self.rng.next_bipolar() * amplitude[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(waveform: Waveform, freq: f32, frames: usize) -> Vec<f32> {
        let sr = 48000.0;
        let dt = freq / sr;
        let mut phase = 0.0;
        (0..frames)
            .map(|_| {
                let v = waveform.sample(phase, dt, 0.25, phase < dt);
                phase = wrap_unit(phase + dt);
                v
            })
            .collect()
    }

    #[test]
    fn sine_frequency() {
        let out = run(Waveform::Sine, 440.0, 48000);
        let crossings = out.windows(2).filter(|w| w[0] <= 0.0 && w[1] > 0.0).count();
        assert!((crossings as i32 - 440).abs() <= 2, "crossings {crossings}");
    }

    #[test]
    fn bandlimited_shapes_stay_bounded() {
        for w in [
            Waveform::Sawtooth,
            Waveform::Square,
            Waveform::Pulse,
            Waveform::Triangle,
        ] {
            for v in run(w, 1234.5, 9600) {
                assert!(v.is_finite() && v.abs() <= 1.5, "{w:?} produced {v}");
            }
        }
    }

    #[test]
    fn pulse_width_sets_duty_cycle() {
        let out = run(Waveform::Pulse, 100.0, 4800);
        let high = out.iter().filter(|&&v| v > 0.0).count();
        let duty = high as f32 / out.len() as f32;
        assert!((duty - 0.25).abs() < 0.02, "duty {duty}");
    }

    #[test]
    fn impulse_once_per_cycle() {
        let out = run(Waveform::Impulse, 480.0, 4800);
        assert_eq!(out.iter().filter(|&&v| v == 1.0).count(), 48);
    }

    #[test]
    fn poly_blep_is_local() {
        assert_eq!(poly_blep(0.5, 0.01), 0.0);
        assert!(poly_blep(0.001, 0.01) < 0.0);
        assert!(poly_blep(0.999, 0.01) > 0.0);
        assert_eq!(poly_blep(0.0, 0.0), 0.0);
    }
}
