//! Granular synthesis.
//!
//! A [`GrainFarm`] runs K independent grain slots. Each slot cycles
//!
//! ```text
//! IDLE ──► GAP ──(countdown)──► RUNNING ──(envelope done)──► GAP ...
//! ```
//!
//! While running it emits `source · envelope · grain amplitude`. Timing comes
//! from a [`GrainScheduler`], the signal from a [`GrainSource`] and the shape
//! from a [`GrainEnvelope`]; each slot owns its own source and envelope.
//!
//! The slots are summed and divided by K. This keeps the mix bounded by a
//! single grain's amplitude; it is not loudness-preserving, and sparse farms
//! sound quieter than dense ones.

mod envelope;
mod scheduler;
mod source;

pub use envelope::{GrainEnvelope, Parabolic, RaisedCosine, Trapezoid};
pub use scheduler::{GrainScheduler, StochasticScheduler};
pub use source::{GrainParams, GrainSource, SampleSource, SineSource};

use libm::roundf;
use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

use crate::rng::Xorshift32;

/// Slot state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GrainState {
    /// Not yet activated.
    #[default]
    Idle,
    /// Waiting `countdown` frames before the next grain.
    Gap,
    /// Producing a grain.
    Running,
}

struct Grain {
    state: GrainState,
    countdown: u32,
    amplitude: f32,
    source: Box<dyn GrainSource>,
    envelope: Box<dyn GrainEnvelope>,
}

impl Grain {
    fn new(source: &dyn GrainSource, envelope: &dyn GrainEnvelope) -> Self {
        Self {
            state: GrainState::Idle,
            countdown: 0,
            amplitude: 0.0,
            source: source.clone_box(),
            envelope: envelope.clone_box(),
        }
    }
}

/// Values of the farm's control inputs for one frame.
struct Controls {
    frequency: f32,
    duration: f32,
    density: f32,
    amplitude_range: f32,
    rate_range: f32,
}

/// A bank of grain slots.
///
/// | Port | Kind | Default |
/// |------|------|---------|
/// | `Frequency` | input, Hz | 440 |
/// | `Amplitude` | input | 0.5 |
/// | `Duration` | input, seconds | 0.05 |
/// | `Density` | input, `(0, 1]` | 0.5 |
/// | `AmplitudeRange` | input, `[0, 1]` | 0 |
/// | `RateRange` | input, `[0, 1)` | 0 |
/// | `Output` | output | |
///
/// Each activation draws `r ∈ [0, 1)` and plays its grain at
/// `1 − r · AmplitudeRange`, so grains never exceed full scale; the playback
/// rate is `1 + RateRange · s` with `s ∈ [−1, 1)`.
///
/// ```rust
/// use patchbay_units::{GrainFarm, Parabolic, SampleSource};
///
/// let mut farm = GrainFarm::new()
///     .with_source(SampleSource::new(vec![0.0, 0.5, 1.0, 0.5]))
///     .with_envelope(Parabolic::new())
///     .with_seed(42);
/// farm.allocate(16);
/// assert_eq!(farm.grain_count(), 16);
/// ```
pub struct GrainFarm {
    grains: Vec<Grain>,
    source: Box<dyn GrainSource>,
    envelope: Box<dyn GrainEnvelope>,
    scheduler: Box<dyn GrainScheduler>,
    rng: Xorshift32,
    sample_rate: f32,
}

impl GrainFarm {
    /// Slots allocated by [`new`](Self::new).
    pub const DEFAULT_GRAINS: usize = 8;

    /// Input index of `Frequency`.
    pub const FREQUENCY: usize = 0;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 1;
    /// Input index of `Duration`.
    pub const DURATION: usize = 2;
    /// Input index of `Density`.
    pub const DENSITY: usize = 3;
    /// Input index of `AmplitudeRange`.
    pub const AMPLITUDE_RANGE: usize = 4;
    /// Input index of `RateRange`.
    pub const RATE_RANGE: usize = 5;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Sine grains with raised-cosine envelopes and stochastic timing.
    pub fn new() -> Self {
        let mut farm = Self {
            grains: Vec::new(),
            source: Box::new(SineSource::new()),
            envelope: Box::new(RaisedCosine::new()),
            scheduler: Box::new(StochasticScheduler),
            rng: Xorshift32::default(),
            sample_rate: 48000.0,
        };
        farm.allocate(Self::DEFAULT_GRAINS);
        farm
    }

    /// Replaces the grain source; slots are reallocated.
    pub fn with_source(mut self, source: impl GrainSource + 'static) -> Self {
        self.source = Box::new(source);
        self.allocate(self.grains.len());
        self
    }

    /// Replaces the grain envelope; slots are reallocated.
    pub fn with_envelope(mut self, envelope: impl GrainEnvelope + 'static) -> Self {
        self.envelope = Box::new(envelope);
        self.allocate(self.grains.len());
        self
    }

    /// Replaces the timing strategy.
    pub fn with_scheduler(mut self, scheduler: impl GrainScheduler + 'static) -> Self {
        self.scheduler = Box::new(scheduler);
        self
    }

    /// Seeds the generator behind gaps, amplitudes and rates.
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.rng = Xorshift32::new(seed);
        self
    }

    /// Reallocates to `count` idle slots (at least 1).
    ///
    /// Allocates; call before the farm is added to a synthesizer.
    pub fn allocate(&mut self, count: usize) {
        let count = count.max(1);
        self.grains = (0..count)
            .map(|_| Grain::new(self.source.as_ref(), self.envelope.as_ref()))
            .collect();
        #[cfg(feature = "tracing")]
        tracing::debug!(count, "grain_farm_allocate");
    }

    /// Number of slots.
    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    /// Slots currently producing a grain.
    pub fn running(&self) -> usize {
        self.grains
            .iter()
            .filter(|g| g.state == GrainState::Running)
            .count()
    }

    /// State of slot `index`.
    pub fn state(&self, index: usize) -> Option<GrainState> {
        self.grains.get(index).map(|g| g.state)
    }

    fn seconds_to_frames(&self, seconds: f32) -> u32 {
        roundf(seconds.max(0.0) * self.sample_rate) as u32
    }

    /// Puts slot `index` into GAP with a fresh countdown.
    fn enter_gap(&mut self, index: usize, c: &Controls) {
        let duration = self.scheduler.duration(c.duration, &mut self.rng);
        let gap = self.scheduler.gap(duration, c.density, &mut self.rng);
        let countdown = self.seconds_to_frames(gap);
        let grain = &mut self.grains[index];
        grain.countdown = countdown;
        grain.state = GrainState::Gap;
    }

    /// Starts the grain in slot `index`.
    fn enter_running(&mut self, index: usize, c: &Controls) {
        let duration = self.scheduler.duration(c.duration, &mut self.rng);
        let amplitude = 1.0 - self.rng.next_f32() * c.amplitude_range;
        let rate = 1.0 + c.rate_range * self.rng.next_bipolar();
        let frames = self.seconds_to_frames(duration).max(1);
        let params = GrainParams {
            frequency: c.frequency,
            rate,
            sample_rate: self.sample_rate,
        };
        let grain = &mut self.grains[index];
        grain.amplitude = amplitude;
        grain.source.start(&params);
        grain.envelope.start(frames);
        grain.state = GrainState::Running;
    }

    /// Advances slot `index` by one frame and returns its sample.
    #[inline]
    fn tick(&mut self, index: usize, c: &Controls) -> f32 {
        match self.grains[index].state {
            GrainState::Idle => {
                self.enter_gap(index, c);
                self.tick(index, c)
            }
            GrainState::Gap => {
                let grain = &mut self.grains[index];
                if grain.countdown > 0 {
                    grain.countdown -= 1;
                    return 0.0;
                }
                self.enter_running(index, c);
                self.tick(index, c)
            }
            GrainState::Running => {
                let grain = &mut self.grains[index];
                let value = grain.source.next() * grain.envelope.next() * grain.amplitude;
                if grain.envelope.is_finished() {
                    self.enter_gap(index, c);
                }
                value
            }
        }
    }
}

impl Default for GrainFarm {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitGenerator for GrainFarm {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Frequency", PortRange::FREQUENCY)
            .input("Amplitude", PortRange::AMPLITUDE)
            .input("Duration", PortRange::new(0.001, 0.05, 2.0))
            .input("Density", PortRange::new(0.001, 0.5, 1.0))
            .input("AmplitudeRange", PortRange::new(0.0, 0.0, 1.0))
            .input("RateRange", PortRange::new(0.0, 0.0, 0.99))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let inputs = io.inputs;
        let amplitude = inputs.values(Self::AMPLITUDE);
        let out = io.outputs.values_mut(Self::OUTPUT);
        let scale = 1.0 / self.grains.len() as f32;
        for i in start..limit {
            let controls = Controls {
                frequency: inputs.values(Self::FREQUENCY)[i],
                duration: inputs.values(Self::DURATION)[i],
                density: inputs.values(Self::DENSITY)[i],
                amplitude_range: inputs.values(Self::AMPLITUDE_RANGE)[i].clamp(0.0, 1.0),
                rate_range: inputs.values(Self::RATE_RANGE)[i].clamp(0.0, 0.99),
            };
            let mut sum = 0.0;
            for g in 0..self.grains.len() {
                sum += self.tick(g, &controls);
            }
            out[i] = sum * scale * amplitude[i];
        }
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        for grain in &mut self.grains {
            grain.state = GrainState::Idle;
            grain.countdown = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls(density: f32) -> Controls {
        Controls {
            frequency: 440.0,
            duration: 0.01,
            density,
            amplitude_range: 0.5,
            rate_range: 0.2,
        }
    }

    #[test]
    fn slots_cycle_through_states() {
        let mut farm = GrainFarm::new().with_seed(1);
        farm.allocate(1);
        assert_eq!(farm.state(0), Some(GrainState::Idle));
        let c = controls(1.0);
        farm.tick(0, &c);
        // Density 1 leaves no gap.
        assert_eq!(farm.state(0), Some(GrainState::Running));
        for _ in 0..479 {
            farm.tick(0, &c);
        }
        assert_eq!(farm.state(0), Some(GrainState::Gap));
    }

    #[test]
    fn grain_amplitude_never_exceeds_base() {
        let mut farm = GrainFarm::new().with_seed(9);
        let c = Controls {
            amplitude_range: 1.0,
            ..controls(0.3)
        };
        for _ in 0..20_000 {
            for g in 0..farm.grain_count() {
                let value = farm.tick(g, &c);
                assert!(value.abs() <= 1.0);
            }
            for grain in &farm.grains {
                assert!(grain.amplitude <= 1.0 && grain.amplitude >= 0.0);
            }
        }
    }

    #[test]
    fn seed_makes_output_reproducible() {
        let run = |seed| {
            let mut farm = GrainFarm::new().with_seed(seed);
            let c = controls(0.4);
            (0..4000)
                .map(|_| (0..farm.grain_count()).map(|g| farm.tick(g, &c)).sum::<f32>())
                .collect::<Vec<f32>>()
        };
        assert_eq!(run(5), run(5));
        assert_ne!(run(5), run(6));
    }

    #[test]
    fn allocate_resizes() {
        let mut farm = GrainFarm::new();
        assert_eq!(farm.grain_count(), GrainFarm::DEFAULT_GRAINS);
        farm.allocate(0);
        assert_eq!(farm.grain_count(), 1);
        assert_eq!(farm.running(), 0);
    }
}
