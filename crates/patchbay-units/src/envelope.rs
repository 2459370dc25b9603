//! Delay-attack-hold-decay-sustain-release envelope.
//!
//! The envelope is a per-frame state machine driven by a gate input:
//!
//! ```text
//!            gate on (from any stage)
//!   IDLE ──────────────► DELAYING ─► ATTACKING ─► HOLDING ─► DECAYING ─► SUSTAINING
//!    ▲                                                          │             │
//!    │      level ≤ −90 dB                                      │ gate off    │
//!    ├────────────────────────── RELEASING ◄────────────────────┴─────────────┘
//!    └──────── decay reached −90 dB (sustain below the floor)
//! ```
//!
//! Attack rises linearly by `1 / frames` from wherever the level is. Decay
//! and release are exponential: each frame multiplies the level by
//! `(−90 dB)^(1 / frames)`, so a full-scale stage reaches the −90 dB floor in
//! exactly its duration. Stages shorter than [`MIN_DURATION`] are skipped.
//!
//! Falling to IDLE from decay or release raises "finished" on the gate, which
//! disables the gate's auto-disable target (typically the voice circuit) and
//! posts [`EngineEvent::UnitFinished`](patchbay_core::EngineEvent).

use libm::{pow, roundf};
use patchbay_core::{DB90, GateEdge, GateTracker, PortLayout, PortRange, UnitGenerator, UnitIo};

/// Shortest stage duration in seconds; shorter stages are skipped.
pub const MIN_DURATION: f32 = 1.0e-5;

/// Stage of an [`EnvelopeDahdsr`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Stage {
    /// Output 0, waiting for a gate.
    #[default]
    Idle,
    /// Holding the level before the attack.
    Delaying,
    /// Rising linearly to 1.
    Attacking,
    /// Holding at 1.
    Holding,
    /// Falling exponentially towards sustain.
    Decaying,
    /// Holding at the sustain level while the gate is on.
    Sustaining,
    /// Falling exponentially towards silence.
    Releasing,
}

/// DAHDSR envelope unit.
///
/// | Port | Kind | Default |
/// |------|------|---------|
/// | `Input` | gate | 0 |
/// | `Delay` | input, seconds | 0 |
/// | `Attack` | input, seconds | 0.1 |
/// | `Hold` | input, seconds | 0 |
/// | `Decay` | input, seconds | 0.2 |
/// | `Sustain` | input, level | 0.5 |
/// | `Release` | input, seconds | 0.3 |
/// | `Amplitude` | input | 1 |
/// | `Current` | variable | level before amplitude |
/// | `Output` | output | `level * Amplitude` |
///
/// Durations are read when their stage starts.
///
/// ```rust
/// use patchbay_core::{SynthConfig, Synthesizer};
/// use patchbay_units::{EnvelopeDahdsr, Stage};
///
/// let mut synth = Synthesizer::new(SynthConfig::with_sample_rate(44100.0).block_size(64));
/// let env = synth.add(EnvelopeDahdsr::new());
/// synth.set(synth.port(env, "Input")?, 1.0)?;
/// synth.start_unit(env)?;
/// synth.start();
/// synth.render_block();
/// assert_eq!(synth.unit_ref::<EnvelopeDahdsr>(env).map(|e| e.stage()), Some(Stage::Attacking));
/// # Ok::<(), patchbay_core::GraphError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EnvelopeDahdsr {
    stage: Stage,
    level: f32,
    gate: GateTracker,
    sample_rate: f32,
    /// Frames left in a timed stage (delay, hold).
    countdown: u32,
    /// Attack increment per frame.
    increment: f32,
    /// Decay/release multiplier per frame.
    scaler: f32,
}

impl EnvelopeDahdsr {
    /// Gate input index.
    pub const INPUT: usize = 0;
    /// Input index of `Delay`.
    pub const DELAY: usize = 1;
    /// Input index of `Attack`.
    pub const ATTACK: usize = 2;
    /// Input index of `Hold`.
    pub const HOLD: usize = 3;
    /// Input index of `Decay`.
    pub const DECAY: usize = 4;
    /// Input index of `Sustain`.
    pub const SUSTAIN: usize = 5;
    /// Input index of `Release`.
    pub const RELEASE: usize = 6;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 7;
    /// Variable index of `Current`.
    pub const CURRENT: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Idle envelope.
    pub fn new() -> Self {
        Self {
            stage: Stage::Idle,
            level: 0.0,
            gate: GateTracker::new(),
            sample_rate: 48000.0,
            countdown: 0,
            increment: 0.0,
            scaler: 1.0,
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Current level in `[0, 1]`, before amplitude.
    pub fn level(&self) -> f32 {
        self.level
    }

    fn frames(&self, seconds: f32) -> Option<u32> {
        (seconds >= MIN_DURATION).then(|| (roundf(seconds * self.sample_rate) as u32).max(1))
    }

    /// Per-frame multiplier that takes full scale to −90 dB in `frames`.
    fn scaler_for(frames: u32) -> f32 {
        pow(DB90, 1.0 / f64::from(frames)) as f32
    }
}

impl Default for EnvelopeDahdsr {
    fn default() -> Self {
        Self::new()
    }
}

/// Stage durations and levels for one frame.
struct Controls {
    delay: f32,
    attack: f32,
    hold: f32,
    decay: f32,
    sustain: f32,
    release: f32,
}

impl EnvelopeDahdsr {
    fn start_delay(&mut self, c: &Controls) {
        match self.frames(c.delay) {
            Some(frames) => {
                self.stage = Stage::Delaying;
                self.countdown = frames;
            }
            None => self.start_attack(c),
        }
    }

    fn start_attack(&mut self, c: &Controls) {
        match self.frames(c.attack) {
            Some(frames) => {
                self.stage = Stage::Attacking;
                self.increment = 1.0 / frames as f32;
            }
            None => {
                self.level = 1.0;
                self.start_hold(c);
            }
        }
    }

    fn start_hold(&mut self, c: &Controls) {
        match self.frames(c.hold) {
            Some(frames) => {
                self.stage = Stage::Holding;
                self.countdown = frames;
            }
            None => self.start_decay(c),
        }
    }

    fn start_decay(&mut self, c: &Controls) {
        match self.frames(c.decay) {
            Some(frames) => {
                self.stage = Stage::Decaying;
                self.scaler = Self::scaler_for(frames);
            }
            None => {
                self.level = c.sustain;
                self.stage = Stage::Sustaining;
            }
        }
    }

    /// Returns true if the envelope went idle.
    fn start_release(&mut self, c: &Controls) -> bool {
        match self.frames(c.release) {
            Some(frames) => {
                self.stage = Stage::Releasing;
                self.scaler = Self::scaler_for(frames);
                false
            }
            None => {
                self.level = 0.0;
                self.stage = Stage::Idle;
                true
            }
        }
    }

    /// Advances one frame. Returns true when the envelope finished.
    #[inline]
    fn step(&mut self, gate: f32, c: &Controls) -> bool {
        let mut finished = false;
        match self.gate.check(gate) {
            GateEdge::On => self.start_delay(c),
            GateEdge::Off if self.stage != Stage::Idle && self.stage != Stage::Releasing => {
                finished = self.start_release(c);
            }
            _ => {}
        }

        match self.stage {
            Stage::Idle => {}
            Stage::Delaying => {
                self.countdown -= 1;
                if self.countdown == 0 {
                    self.start_attack(c);
                }
            }
            Stage::Attacking => {
                self.level += self.increment;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.start_hold(c);
                }
            }
            Stage::Holding => {
                self.countdown -= 1;
                if self.countdown == 0 {
                    self.start_decay(c);
                }
            }
            Stage::Decaying => {
                self.level *= self.scaler;
                let floor = DB90 as f32;
                if c.sustain >= floor && self.level <= c.sustain {
                    self.level = c.sustain;
                    self.stage = Stage::Sustaining;
                } else if self.level <= floor {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                    finished = true;
                }
            }
            Stage::Sustaining => self.level = c.sustain,
            Stage::Releasing => {
                self.level *= self.scaler;
                if self.level <= DB90 as f32 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                    finished = true;
                }
            }
        }
        finished
    }
}

impl UnitGenerator for EnvelopeDahdsr {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .gate("Input")
            .input("Delay", PortRange::seconds(0.0))
            .input("Attack", PortRange::seconds(0.1))
            .input("Hold", PortRange::seconds(0.0))
            .input("Decay", PortRange::seconds(0.2))
            .input("Sustain", PortRange::new(0.0, 0.5, 1.0))
            .input("Release", PortRange::seconds(0.3))
            .input("Amplitude", PortRange::new(0.0, 1.0, 1.0))
            .variable("Current", 0.0)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let inputs = io.inputs;
        let gate = inputs.values(Self::INPUT);
        let amplitude = inputs.values(Self::AMPLITUDE);
        let out = io.outputs.values_mut(Self::OUTPUT);
        for i in start..limit {
            let controls = Controls {
                delay: inputs.values(Self::DELAY)[i],
                attack: inputs.values(Self::ATTACK)[i],
                hold: inputs.values(Self::HOLD)[i],
                decay: inputs.values(Self::DECAY)[i],
                sustain: inputs.values(Self::SUSTAIN)[i].clamp(0.0, 1.0),
                release: inputs.values(Self::RELEASE)[i],
            };
            if self.step(gate[i], &controls) {
                io.signals.finished(Self::INPUT);
            }
            out[i] = self.level * amplitude[i];
        }
        io.variables.set(Self::CURRENT, self.level);
    }

    fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
    }

    fn reset(&mut self) {
        *self = Self {
            sample_rate: self.sample_rate,
            ..Self::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controls(attack: f32, decay: f32, sustain: f32) -> Controls {
        Controls {
            delay: 0.0,
            attack,
            hold: 0.0,
            decay,
            sustain,
            release: 0.3,
        }
    }

    fn envelope(sample_rate: f32) -> EnvelopeDahdsr {
        let mut env = EnvelopeDahdsr::new();
        env.set_sample_rate(sample_rate);
        env
    }

    #[test]
    fn attack_then_decay_to_idle() {
        let mut env = envelope(44100.0);
        let c = controls(0.01, 0.2, 0.0);
        let mut peak_frame = None;
        let mut idle_frame = None;
        for n in 0..20_000u32 {
            let finished = env.step(1.0, &c);
            if peak_frame.is_none() && env.level() == 1.0 {
                peak_frame = Some(n);
            }
            if finished {
                idle_frame = Some(n);
                break;
            }
        }
        let peak = peak_frame.unwrap();
        assert!(peak.abs_diff(440) <= 1, "peak at {peak}");
        let idle = idle_frame.unwrap();
        assert!(idle.abs_diff(440 + 8820) <= 2, "idle at {idle}");
        assert_eq!(env.stage(), Stage::Idle);
    }

    #[test]
    fn decay_stops_at_sustain() {
        let mut env = envelope(48000.0);
        let c = controls(0.001, 0.01, 0.5);
        for _ in 0..4800 {
            env.step(1.0, &c);
        }
        assert_eq!(env.stage(), Stage::Sustaining);
        assert_eq!(env.level(), 0.5);
    }

    #[test]
    fn gate_on_enters_delay_within_the_frame() {
        let mut env = envelope(48000.0);
        let mut c = controls(0.1, 0.2, 0.5);
        c.delay = 0.01;
        env.step(1.0, &c);
        assert_eq!(env.stage(), Stage::Delaying);
        for _ in 0..480 {
            env.step(1.0, &c);
        }
        assert_eq!(env.stage(), Stage::Attacking);
    }

    #[test]
    fn retrigger_attacks_from_current_level() {
        let mut env = envelope(48000.0);
        let c = controls(0.01, 0.2, 0.5);
        for _ in 0..240 {
            env.step(1.0, &c);
        }
        let mid = env.level();
        assert!(mid > 0.4 && mid < 0.6, "{mid}");
        env.step(0.0, &c);
        assert_eq!(env.stage(), Stage::Releasing);
        env.step(1.0, &c);
        assert_eq!(env.stage(), Stage::Attacking);
        assert!(env.level() > mid * 0.99);
    }

    #[test]
    fn zero_durations_skip_stages() {
        let mut env = envelope(48000.0);
        let c = Controls {
            delay: 0.0,
            attack: 0.0,
            hold: 0.0,
            decay: 0.0,
            sustain: 0.7,
            release: 0.0,
        };
        env.step(1.0, &c);
        assert_eq!(env.stage(), Stage::Sustaining);
        assert_eq!(env.level(), 0.7);
        assert!(env.step(0.0, &c));
        assert_eq!(env.stage(), Stage::Idle);
        assert_eq!(env.level(), 0.0);
    }

    #[test]
    fn release_reaches_floor_in_its_duration() {
        let mut env = envelope(1000.0);
        let c = Controls {
            delay: 0.0,
            attack: 0.0,
            hold: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.5,
        };
        env.step(1.0, &c);
        let mut frames = 0;
        env.step(0.0, &c);
        frames += 1;
        while env.stage() == Stage::Releasing {
            env.step(0.0, &c);
            frames += 1;
        }
        assert!((frames as i32 - 500).abs() <= 1, "{frames}");
    }

    #[test]
    fn idle_ignores_gate_off() {
        let mut env = envelope(48000.0);
        let c = controls(0.1, 0.2, 0.5);
        assert!(!env.step(0.0, &c));
        assert_eq!(env.stage(), Stage::Idle);
    }
}
