//! The unit generator trait and the per-call view of a unit's ports.
//!
//! A unit generator is a DSP object that declares its ports through
//! [`UnitGenerator::layout`] and fills its outputs in
//! [`UnitGenerator::generate`]. The synthesizer owns the port storage; on each
//! call the unit receives a [`UnitIo`] whose fields borrow its own ports
//! independently, so inputs can be read while outputs are written:
//!
//! ```rust
//! use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};
//!
//! struct Gain;
//!
//! impl Gain {
//!     const INPUT: usize = 0;
//!     const GAIN: usize = 1;
//!     const OUTPUT: usize = 0;
//! }
//!
//! impl UnitGenerator for Gain {
//!     fn layout(&self) -> PortLayout {
//!         PortLayout::new()
//!             .input("Input", PortRange::SIGNAL)
//!             .input("Gain", PortRange::new(0.0, 1.0, 4.0))
//!             .output("Output")
//!     }
//!
//!     fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
//!         let input = io.inputs.values(Self::INPUT);
//!         let gain = io.inputs.values(Self::GAIN);
//!         let out = io.outputs.values_mut(Self::OUTPUT);
//!         for i in start..limit {
//!             out[i] = input[i] * gain[i];
//!         }
//!     }
//! }
//! ```
//!
//! `generate` must only touch indices in `[start, limit)`: blocks are split
//! into slices at scheduled command boundaries and each slice is a separate
//! call.

use std::any::Any;

use crate::bus::OutputBus;
use crate::event::Signal;
use crate::function::Function;
use crate::graph::UnitId;
use crate::port::{
    FunctionPort, InputPort, OutputPort, PortId, PortKind, PortLayout, QueuePort,
    SpectralInputPort, SpectralOutputPort, VariablePort,
};
use crate::queue::DataQueue;
use crate::spectral::Spectrum;

/// A node of the signal graph.
///
/// Implementations own their DSP state privately; all communication goes
/// through ports.
pub trait UnitGenerator: Any + Send {
    /// Ports this unit exposes. Called once when the unit is added.
    fn layout(&self) -> PortLayout;

    /// Computes outputs for frames `[start, limit)` of the current block.
    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize);

    /// Called when the unit is added, before any `generate`.
    fn set_sample_rate(&mut self, _sample_rate: f32) {}

    /// Clears internal state.
    fn reset(&mut self) {}

    /// True for sinks that do nothing unless explicitly started.
    fn is_start_required(&self) -> bool {
        false
    }

    /// Name for diagnostics.
    fn type_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

/// Gate transition reported by [`GateTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEdge {
    /// No change.
    None,
    /// Rose above the on-threshold after being off.
    On,
    /// Fell to zero or below after being on.
    Off,
}

/// Hysteresis detector for gate inputs.
///
/// Turns on when the value exceeds [`ON_THRESHOLD`](Self::ON_THRESHOLD)
/// while off, and off when it drops to 0 or below while on.
#[derive(Debug, Clone, Copy, Default)]
pub struct GateTracker {
    on: bool,
}

impl GateTracker {
    /// Level a gate must exceed to turn on.
    pub const ON_THRESHOLD: f32 = 0.01;

    /// New tracker in the off state.
    pub const fn new() -> Self {
        Self { on: false }
    }

    /// Feeds one sample.
    #[inline]
    pub fn check(&mut self, value: f32) -> GateEdge {
        if !self.on && value > Self::ON_THRESHOLD {
            self.on = true;
            GateEdge::On
        } else if self.on && value <= 0.0 {
            self.on = false;
            GateEdge::Off
        } else {
            GateEdge::None
        }
    }

    /// Current state.
    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// Everything a unit may touch during one `generate` call.
pub struct UnitIo<'a> {
    /// This unit's inputs, already summed for the slice.
    pub inputs: Inputs<'a>,
    /// This unit's outputs.
    pub outputs: Outputs<'a>,
    /// This unit's variables.
    pub variables: Variables<'a>,
    /// This unit's data queues.
    pub queues: Queues<'a>,
    /// This unit's function ports.
    pub functions: Functions<'a>,
    /// This unit's spectral inputs.
    pub spectral_inputs: SpectralInputs<'a>,
    /// This unit's spectral outputs.
    pub spectral_outputs: SpectralOutputs<'a>,
    /// The engine output bus.
    pub bus: &'a mut OutputBus,
    /// Lifecycle notifications back to the engine.
    pub signals: Signals<'a>,
    /// Engine sample rate.
    pub sample_rate: f32,
    /// Absolute frame of index 0 of the current block.
    pub frame: u64,
}

/// Read access to a unit's inputs.
#[derive(Clone, Copy)]
pub struct Inputs<'a> {
    ports: &'a [InputPort],
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(ports: &'a [InputPort]) -> Self {
        Self { ports }
    }

    /// Block buffer of part 0 of input `port`.
    #[inline]
    pub fn values(&self, port: usize) -> &'a [f32] {
        self.ports[port].values()
    }

    /// Block buffer of `part` of input `port`.
    #[inline]
    pub fn part(&self, port: usize, part: usize) -> &'a [f32] {
        self.ports[port].part(part)
    }

    /// Part count of input `port`.
    #[inline]
    pub fn parts(&self, port: usize) -> usize {
        self.ports[port].parts()
    }

    /// True when input `port` has an upstream connection.
    pub fn is_connected(&self, port: usize) -> bool {
        self.ports[port].is_connected()
    }

    /// Number of inputs.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// True when the unit has no inputs.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

/// Write access to a unit's outputs.
pub struct Outputs<'a> {
    ports: &'a mut [OutputPort],
}

impl<'a> Outputs<'a> {
    pub(crate) fn new(ports: &'a mut [OutputPort]) -> Self {
        Self { ports }
    }

    /// Block buffer of part 0 of output `port`.
    #[inline]
    pub fn values_mut(&mut self, port: usize) -> &mut [f32] {
        self.ports[port].values_mut()
    }

    /// Block buffer of `part` of output `port`.
    #[inline]
    pub fn part_mut(&mut self, port: usize, part: usize) -> &mut [f32] {
        self.ports[port].part_mut(part)
    }

    /// Part count of output `port`.
    #[inline]
    pub fn parts(&self, port: usize) -> usize {
        self.ports[port].parts()
    }
}

/// Access to a unit's variables.
pub struct Variables<'a> {
    ports: &'a mut [VariablePort],
}

impl<'a> Variables<'a> {
    pub(crate) fn new(ports: &'a mut [VariablePort]) -> Self {
        Self { ports }
    }

    /// Value of variable `port`.
    #[inline]
    pub fn get(&self, port: usize) -> f32 {
        self.ports[port].get()
    }

    /// Sets variable `port`.
    #[inline]
    pub fn set(&mut self, port: usize, value: f32) {
        self.ports[port].set(value);
    }
}

/// Access to a unit's data queues.
pub struct Queues<'a> {
    ports: &'a mut [QueuePort],
}

impl<'a> Queues<'a> {
    pub(crate) fn new(ports: &'a mut [QueuePort]) -> Self {
        Self { ports }
    }

    /// Queue behind port `port`.
    #[inline]
    pub fn get(&mut self, port: usize) -> &mut DataQueue {
        &mut self.ports[port].queue
    }
}

/// Access to a unit's function ports.
#[derive(Clone, Copy)]
pub struct Functions<'a> {
    ports: &'a [FunctionPort],
}

impl<'a> Functions<'a> {
    pub(crate) fn new(ports: &'a [FunctionPort]) -> Self {
        Self { ports }
    }

    /// Function held by port `port`.
    #[inline]
    pub fn get(&self, port: usize) -> &'a dyn Function {
        self.ports[port].function()
    }
}

/// Read access to a unit's spectral inputs.
#[derive(Clone, Copy)]
pub struct SpectralInputs<'a> {
    ports: &'a [SpectralInputPort],
}

impl<'a> SpectralInputs<'a> {
    pub(crate) fn new(ports: &'a [SpectralInputPort]) -> Self {
        Self { ports }
    }

    /// Frame that arrived for this slice, if any.
    pub fn fresh(&self, port: usize) -> Option<&'a Spectrum> {
        self.ports[port].fresh()
    }

    /// Most recent frame.
    pub fn spectrum(&self, port: usize) -> &'a Spectrum {
        self.ports[port].spectrum()
    }
}

/// Write access to a unit's spectral outputs.
pub struct SpectralOutputs<'a> {
    ports: &'a mut [SpectralOutputPort],
}

impl<'a> SpectralOutputs<'a> {
    pub(crate) fn new(ports: &'a mut [SpectralOutputPort]) -> Self {
        Self { ports }
    }

    /// Spectral output `port`.
    pub fn get(&mut self, port: usize) -> &mut SpectralOutputPort {
        &mut self.ports[port]
    }
}

/// Lifecycle signals raised from inside `generate`.
///
/// They are recorded and acted upon once the current slice is complete.
pub struct Signals<'a> {
    unit: UnitId,
    input_base: usize,
    sink: &'a mut Vec<Signal>,
}

impl<'a> Signals<'a> {
    pub(crate) fn new(unit: UnitId, input_base: usize, sink: &'a mut Vec<Signal>) -> Self {
        Self {
            unit,
            input_base,
            sink,
        }
    }

    /// The unit has finished; disables the auto-disable target of gate
    /// input `gate`, if one is set.
    pub fn finished(&mut self, gate: usize) {
        self.sink.push(Signal::Finished {
            unit: self.unit,
            gate: Some(self.input_base + gate),
        });
    }

    /// The unit has finished and has no gate.
    pub fn finished_ungated(&mut self) {
        self.sink.push(Signal::Finished {
            unit: self.unit,
            gate: None,
        });
    }

    /// Data queue `queue` ran dry.
    pub fn starved(&mut self, queue: usize) {
        self.sink.push(Signal::Starved {
            port: PortId::new(self.unit, PortKind::Queue, queue),
        });
    }
}
