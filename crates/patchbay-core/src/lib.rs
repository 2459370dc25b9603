//! Patchbay Core - signal-graph runtime for modular synthesis
//!
//! This crate is the engine underneath patchbay's unit generators: the
//! port and connection model, pull-based block evaluation, composite
//! circuits, and a scheduler that lands timestamped commands on exact
//! sample frames.
//!
//! # Core Abstractions
//!
//! - [`UnitGenerator`] - Object-safe trait every DSP node implements
//! - [`PortLayout`] - A unit's declared inputs, outputs, variables, queues,
//!   function and spectral ports
//! - [`Synthesizer`] - Owns the unit arena, wiring, timeline and render loop
//! - [`SynthHandle`] - `Clone + Send` scheduling handle for control threads
//!
//! ## Evaluation
//!
//! Sinks are started; everything upstream of them is pulled on demand once
//! per slice. A frame-stamp recorded before recursion makes diamonds run
//! once and feedback cycles terminate, resolving one block behind.
//!
//! ## Scheduling
//!
//! Commands target absolute frames. Blocks are split into slices at command
//! frames so a value set for frame 17 of a block is observed from sample 17
//! exactly.
//!
//! ## Streaming data
//!
//! Data-queue ports stream [`SequentialData`] (samples, breakpoint
//! envelopes) with loop counts and sustain/release loops.
//!
//! # Example
//!
//! ```rust
//! use patchbay_core::{PortLayout, PortRange, SynthConfig, Synthesizer, UnitGenerator, UnitIo};
//!
//! struct Dc;
//!
//! impl UnitGenerator for Dc {
//!     fn layout(&self) -> PortLayout {
//!         PortLayout::new().input("Level", PortRange::SIGNAL).output("Output")
//!     }
//!
//!     fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
//!         let level = io.inputs.values(0);
//!         io.outputs.values_mut(0)[start..limit].copy_from_slice(&level[start..limit]);
//!     }
//! }
//!
//! let mut synth = Synthesizer::new(SynthConfig::default().block_size(8));
//! let dc = synth.add(Dc);
//! let level = synth.port(dc, "level")?;
//! synth.set(level, 0.25)?;
//! synth.start_unit(dc)?;
//! synth.start();
//! synth.render_block();
//! assert_eq!(synth.values(synth.port(dc, "Output")?, 0)?, &[0.25; 8]);
//! # Ok::<(), patchbay_core::GraphError>(())
//! ```

pub mod bus;
pub mod config;
pub mod error;
pub mod event;
pub mod function;
pub mod graph;
pub mod handle;
pub mod math;
pub mod port;
pub mod queue;
pub mod scheduler;
pub mod spectral;
pub mod synth;
pub mod unit;

pub use bus::OutputBus;
pub use config::SynthConfig;
pub use error::{GraphError, ScheduleError};
pub use event::EngineEvent;
pub use function::{Function, Identity, LookupTable};
pub use graph::{Preset, UnitId};
pub use handle::SynthHandle;
pub use math::{
    DB90, DenormalGuard, db_to_linear, flush_denormal, lerp, linear_to_db, phase_increment,
    safe_ratio,
};
pub use port::{PortId, PortKind, PortLayout, PortRange};
pub use queue::{
    DataQueue, FloatSample, LoopRange, Loops, QueueCallback, QueueEvent, QueueEventKind,
    QueueRequest, ReadStatus, SegmentedEnvelope, SequentialData,
};
pub use scheduler::CommandId;
pub use spectral::Spectrum;
pub use synth::Synthesizer;
pub use unit::{GateEdge, GateTracker, UnitGenerator, UnitIo};
