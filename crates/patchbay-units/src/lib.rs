//! Patchbay Units - unit generators for the patchbay synthesis engine
//!
//! Every type here implements [`patchbay_core::UnitGenerator`] and is added
//! to a [`Synthesizer`](patchbay_core::Synthesizer) with `add`. Port indices
//! are exposed as associated constants (`Oscillator::FREQUENCY`, ...) and
//! ports are also reachable by name through `Synthesizer::port`.
//!
//! # Units
//!
//! ## Sources
//!
//! - [`Oscillator`] - One oscillator with a pluggable [`Waveform`]
//!   (PolyBLEP band-limited saw/square/pulse)
//! - [`WhiteNoise`] - Seeded noise
//! - [`GrainFarm`] - Granular synthesis with pluggable [`GrainScheduler`],
//!   [`GrainSource`] and [`GrainEnvelope`]
//!
//! ## Filters
//!
//! - [`BiquadFilter`] - RBJ biquad with a [`Response`] strategy
//! - [`FilterFourPoles`] - Resonant four-pole ladder
//! - [`FilterOnePole`] - One-pole low-pass
//!
//! ## Envelopes and control
//!
//! - [`EnvelopeDahdsr`] - Gate-driven DAHDSR with auto-disable on finish
//! - [`EnvelopePlayer`] - Breakpoint envelopes streamed through a data queue
//! - [`LinearRamp`] - Smooths a control value
//!
//! ## Arithmetic and routing
//!
//! - [`Add`], [`Multiply`], [`MultiplyAdd`], [`PassThrough`], [`Mixer`]
//! - [`FunctionEvaluator`] - Waveshaping through a function port
//! - [`LineOut`] - Stereo sink into the engine output bus
//!
//! ## Sample and spectral
//!
//! - [`SampleReader`] - Plays queued sample data
//! - [`SpectralFft`] / [`SpectralIfft`] - Sample ↔ spectral port bridges
//!
//! # Example: enveloped sine
//!
//! ```rust
//! use patchbay_core::{SynthConfig, Synthesizer};
//! use patchbay_units::{EnvelopeDahdsr, LineOut, Oscillator};
//!
//! let mut synth = Synthesizer::new(SynthConfig::default());
//! let osc = synth.add(Oscillator::sine());
//! let env = synth.add(EnvelopeDahdsr::new());
//! let out = synth.add(LineOut::new());
//!
//! synth.connect(synth.port(env, "Output")?, synth.port(osc, "Amplitude")?)?;
//! synth.connect_parts(synth.port(osc, "Output")?, 0, synth.port(out, "Input")?, 0)?;
//! synth.connect_parts(synth.port(osc, "Output")?, 0, synth.port(out, "Input")?, 1)?;
//! synth.set(synth.port(env, "Input")?, 1.0)?;
//!
//! synth.start_unit(out)?;
//! synth.start();
//! let bus = synth.render_block();
//! assert!(bus.channel(0).iter().all(|s| s.abs() <= 1.0));
//! # Ok::<(), patchbay_core::GraphError>(())
//! ```

pub mod arithmetic;
pub mod envelope;
pub mod filter;
pub mod function;
pub mod granular;
pub mod line_out;
pub mod oscillator;
pub mod ramp;
pub mod reader;
pub mod rng;
pub mod spectral;

pub use arithmetic::{Add, Mixer, Multiply, MultiplyAdd, PassThrough};
pub use envelope::{EnvelopeDahdsr, Stage};
pub use filter::{BiquadFilter, Coefficients, FilterFourPoles, FilterOnePole, Response};
pub use function::FunctionEvaluator;
pub use granular::{
    GrainEnvelope, GrainFarm, GrainParams, GrainScheduler, GrainSource, GrainState, Parabolic,
    RaisedCosine, SampleSource, SineSource, StochasticScheduler, Trapezoid,
};
pub use line_out::LineOut;
pub use oscillator::{Oscillator, Waveform, WhiteNoise};
pub use ramp::LinearRamp;
pub use reader::{EnvelopePlayer, SampleReader};
pub use rng::Xorshift32;
pub use spectral::{DEFAULT_FFT_SIZE, SpectralFft, SpectralIfft};
