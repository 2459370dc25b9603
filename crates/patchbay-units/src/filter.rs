//! Recursive filters.
//!
//! - [`BiquadFilter`]: second-order section with a selectable [`Response`],
//!   coefficients from the RBJ Audio EQ Cookbook.
//! - [`FilterFourPoles`]: four cascaded one-pole stages with resonance
//!   feedback (ladder style).
//! - [`FilterOnePole`]: 6 dB/octave lowpass.
//!
//! All three recompute coefficients only when their control inputs change
//! and add a [`DenormalGuard`] offset to the signal entering the recursion.

use core::f32::consts::PI;

use libm::{cosf, expf, powf, sinf, sqrtf};
use patchbay_core::{DenormalGuard, PortLayout, PortRange, UnitGenerator, UnitIo, safe_ratio};

/// Frequency response of a [`BiquadFilter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Response {
    /// 12 dB/octave lowpass.
    #[default]
    LowPass,
    /// 12 dB/octave highpass.
    HighPass,
    /// Constant 0 dB peak bandpass.
    BandPass,
    /// Band reject.
    Notch,
    /// Bell boost/cut by `Gain` dB.
    Peaking,
    /// Shelf below `Frequency`, `Gain` dB.
    LowShelf,
    /// Shelf above `Frequency`, `Gain` dB.
    HighShelf,
}

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feedforward.
    pub b0: f32,
    /// Feedforward.
    pub b1: f32,
    /// Feedforward.
    pub b2: f32,
    /// Feedback.
    pub a1: f32,
    /// Feedback.
    pub a2: f32,
}

impl Coefficients {
    /// Passes the signal unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv = safe_ratio(1.0, a0);
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }
}

impl Response {
    /// Cookbook coefficients for this response.
    ///
    /// `frequency` is clamped to `(0, 0.49 * sample_rate]` and `q` kept
    /// positive so the section stays stable.
    pub fn coefficients(self, frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Coefficients {
        let frequency = frequency.clamp(1.0, 0.49 * sample_rate);
        let omega = 2.0 * PI * frequency / sample_rate;
        let cos_w = cosf(omega);
        let sin_w = sinf(omega);
        let alpha = safe_ratio(sin_w, 2.0 * q.max(0.01));
        let a = powf(10.0, gain_db / 40.0);

        match self {
            Response::LowPass => Coefficients::normalized(
                (1.0 - cos_w) / 2.0,
                1.0 - cos_w,
                (1.0 - cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            Response::HighPass => Coefficients::normalized(
                (1.0 + cos_w) / 2.0,
                -(1.0 + cos_w),
                (1.0 + cos_w) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            Response::BandPass => Coefficients::normalized(
                alpha,
                0.0,
                -alpha,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            Response::Notch => Coefficients::normalized(
                1.0,
                -2.0 * cos_w,
                1.0,
                1.0 + alpha,
                -2.0 * cos_w,
                1.0 - alpha,
            ),
            Response::Peaking => Coefficients::normalized(
                1.0 + alpha * a,
                -2.0 * cos_w,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_w,
                1.0 - alpha / a,
            ),
            Response::LowShelf => {
                let k = 2.0 * sqrtf(a) * alpha;
                Coefficients::normalized(
                    a * ((a + 1.0) - (a - 1.0) * cos_w + k),
                    2.0 * a * ((a - 1.0) - (a + 1.0) * cos_w),
                    a * ((a + 1.0) - (a - 1.0) * cos_w - k),
                    (a + 1.0) + (a - 1.0) * cos_w + k,
                    -2.0 * ((a - 1.0) + (a + 1.0) * cos_w),
                    (a + 1.0) + (a - 1.0) * cos_w - k,
                )
            }
            Response::HighShelf => {
                let k = 2.0 * sqrtf(a) * alpha;
                Coefficients::normalized(
                    a * ((a + 1.0) + (a - 1.0) * cos_w + k),
                    -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_w),
                    a * ((a + 1.0) + (a - 1.0) * cos_w - k),
                    (a + 1.0) - (a - 1.0) * cos_w + k,
                    2.0 * ((a - 1.0) - (a + 1.0) * cos_w),
                    (a + 1.0) - (a - 1.0) * cos_w - k,
                )
            }
        }
    }
}

/// Direct Form I biquad state.
#[derive(Debug, Clone, Copy, Default)]
struct Section {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Section {
    #[inline]
    fn process(&mut self, c: &Coefficients, x: f32) -> f32 {
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }
}

/// Second-order filter unit.
///
/// Inputs `Input`, `Frequency` (Hz), `Q`, `Gain` (dB, peaking and shelf
/// responses only); output `Output`.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    response: Response,
    sample_rate: f32,
    coefficients: Coefficients,
    /// Control values the coefficients were computed for.
    controls: [f32; 3],
    section: Section,
    guard: DenormalGuard,
}

impl BiquadFilter {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Frequency`.
    pub const FREQUENCY: usize = 1;
    /// Input index of `Q`.
    pub const Q: usize = 2;
    /// Input index of `Gain`.
    pub const GAIN: usize = 3;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Creates a filter with the given response.
    pub fn new(response: Response) -> Self {
        Self {
            response,
            sample_rate: 48000.0,
            coefficients: Coefficients::IDENTITY,
            controls: [f32::NAN; 3],
            section: Section::default(),
            guard: DenormalGuard::new(),
        }
    }

    /// Lowpass filter.
    pub fn lowpass() -> Self {
        Self::new(Response::LowPass)
    }

    /// Current response.
    pub fn response(&self) -> Response {
        self.response
    }

    /// Changes the response; coefficients are recomputed on the next sample.
    pub fn set_response(&mut self, response: Response) {
        self.response = response;
        self.controls = [f32::NAN; 3];
    }

    /// Coefficients currently in use.
    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    #[inline]
    fn update(&mut self, frequency: f32, q: f32, gain: f32) {
        let controls = [frequency, q, gain];
        if controls != self.controls {
            self.controls = controls;
            self.coefficients = self
                .response
                .coefficients(frequency, q, gain, self.sample_rate);
        }
    }
}

impl UnitGenerator for BiquadFilter {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .input("Frequency", PortRange::new(20.0, 1000.0, 20000.0))
            .input("Q", PortRange::new(0.1, 0.707, 20.0))
            .input("Gain", PortRange::new(-24.0, 0.0, 24.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let input = io.inputs.values(Self::INPUT);
        let frequency = io.inputs.values(Self::FREQUENCY);
        let q = io.inputs.values(Self::Q);
        let gain = io.inputs.values(Self::GAIN);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            self.update(frequency[i], q[i], gain[i]);
            let x = input[i] + self.guard.next();
            out[i] = self.section.process(&self.coefficients, x);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.controls = [f32::NAN; 3];
    }

    fn reset(&mut self) {
        self.section = Section::default();
    }
}

/// Four-pole resonant lowpass.
///
/// Inputs `Input`, `Frequency` (Hz), `Q` (resonance, self-oscillates near
/// 4); output `Output`. Unity gain at DC with no resonance.
#[derive(Debug, Clone)]
pub struct FilterFourPoles {
    sample_rate: f32,
    /// Stage inputs and outputs from the previous frame.
    x: [f32; 4],
    y: [f32; 4],
    guard: DenormalGuard,
}

impl FilterFourPoles {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Frequency`.
    pub const FREQUENCY: usize = 1;
    /// Input index of `Q`.
    pub const Q: usize = 2;
    /// Output index.
    pub const OUTPUT: usize = 0;

    const CUTOFF_SCALE: f32 = 1.16;
    const FEEDBACK_DAMPING: f32 = 0.15;
    const INPUT_GAIN: f32 = 0.35013;
    const STAGE_FEEDFORWARD: f32 = 0.3;

    /// Creates a filter with cleared state.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            x: [0.0; 4],
            y: [0.0; 4],
            guard: DenormalGuard::new(),
        }
    }

    #[inline]
    fn process(&mut self, input: f32, frequency: f32, q: f32) -> f32 {
        let fc = (2.0 * frequency / self.sample_rate).clamp(0.0, 1.0);
        let f = fc * Self::CUTOFF_SCALE;
        let f2 = f * f;
        let feedback = q * (1.0 - Self::FEEDBACK_DAMPING * f2);

        let mut s = input - self.y[3] * feedback;
        s *= Self::INPUT_GAIN * f2 * f2;
        s += self.guard.next();
        for stage in 0..4 {
            let y = s + Self::STAGE_FEEDFORWARD * self.x[stage] + (1.0 - f) * self.y[stage];
            self.x[stage] = s;
            self.y[stage] = y;
            s = y;
        }
        s
    }
}

impl Default for FilterFourPoles {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitGenerator for FilterFourPoles {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .input("Frequency", PortRange::new(20.0, 1000.0, 20000.0))
            .input("Q", PortRange::new(0.0, 0.5, 4.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let input = io.inputs.values(Self::INPUT);
        let frequency = io.inputs.values(Self::FREQUENCY);
        let q = io.inputs.values(Self::Q);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = self.process(input[i], frequency[i], q[i]);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        self.x = [0.0; 4];
        self.y = [0.0; 4];
    }
}

/// One-pole lowpass: `y[n] = (1 - c) x[n] + c y[n-1]`, `c = exp(-2π f / sr)`.
///
/// Inputs `Input`, `Frequency` (Hz); output `Output`.
#[derive(Debug, Clone)]
pub struct FilterOnePole {
    sample_rate: f32,
    frequency: f32,
    coeff: f32,
    state: f32,
    guard: DenormalGuard,
}

impl FilterOnePole {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Input index of `Frequency`.
    pub const FREQUENCY: usize = 1;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Creates a filter with cleared state.
    pub fn new() -> Self {
        Self {
            sample_rate: 48000.0,
            frequency: f32::NAN,
            coeff: 0.0,
            state: 0.0,
            guard: DenormalGuard::new(),
        }
    }
}

impl FilterOnePole {
    #[inline]
    fn process(&mut self, input: f32, frequency: f32) -> f32 {
        if frequency != self.frequency {
            self.frequency = frequency;
            let f = frequency.clamp(0.0, 0.5 * self.sample_rate);
            self.coeff = expf(-2.0 * PI * f / self.sample_rate);
        }
        let x = input + self.guard.next();
        self.state = x + self.coeff * (self.state - x);
        self.state
    }
}

impl Default for FilterOnePole {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitGenerator for FilterOnePole {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .input("Frequency", PortRange::new(1.0, 1000.0, 20000.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let input = io.inputs.values(Self::INPUT);
        let frequency = io.inputs.values(Self::FREQUENCY);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            out[i] = self.process(input[i], frequency[i]);
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.frequency = f32::NAN;
    }

    fn reset(&mut self) {
        self.state = 0.0;
    }
}
