//! Ports: the typed connection points of a unit generator.
//!
//! A unit declares its ports once through a [`PortLayout`]. The synthesizer
//! turns the layout into port storage kept in per-kind arenas, so that during
//! `generate()` a unit's inputs, outputs, variables and queues can be borrowed
//! independently of each other and of every other unit.
//!
//! Ports are addressed from the host side by [`PortId`] (unit, kind, index
//! within that kind). Within a unit they are addressed by the plain index,
//! which unit types expose as associated constants.

use std::fmt;
use std::sync::Arc;

use crate::function::{Function, Identity};
use crate::graph::UnitId;
use crate::queue::DataQueue;
use crate::spectral::Spectrum;

/// Storage class of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortKind {
    /// Block-rate input summed from connected outputs (gates included).
    Input,
    /// Block-rate output.
    Output,
    /// Scalar owned by the unit, settable and readable by the host.
    Variable,
    /// Queue of sequential data requests.
    Queue,
    /// Holds a host-supplied [`Function`].
    Function,
    /// Receives complex frames from a spectral output.
    SpectralInput,
    /// Publishes complex frames.
    SpectralOutput,
}

/// Handle to one port of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortId {
    unit: UnitId,
    kind: PortKind,
    index: u16,
}

impl PortId {
    pub(crate) fn new(unit: UnitId, kind: PortKind, index: usize) -> Self {
        Self {
            unit,
            kind,
            index: index as u16,
        }
    }

    /// Unit that owns the port.
    #[inline]
    pub fn unit(self) -> UnitId {
        self.unit
    }

    /// Storage class of the port.
    #[inline]
    pub fn kind(self) -> PortKind {
        self.kind
    }

    /// Index among the unit's ports of the same kind.
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:?}[{}]", self.unit, self.kind, self.index)
    }
}

/// Advisory value range of an input.
///
/// The engine never clamps against it; it is metadata for hosts and editors.
/// `default` is also the initial held value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortRange {
    /// Lowest sensible value.
    pub min: f32,
    /// Initial value.
    pub default: f32,
    /// Highest sensible value.
    pub max: f32,
}

impl PortRange {
    /// Creates a range.
    pub const fn new(min: f32, default: f32, max: f32) -> Self {
        Self { min, default, max }
    }

    /// Audio-rate signal, nominally in \[-1, 1\], default 0.
    pub const SIGNAL: Self = Self::new(-1.0, 0.0, 1.0);
    /// Amplitude, default 0.5.
    pub const AMPLITUDE: Self = Self::new(0.0, 0.5, 1.0);
    /// Oscillator frequency in Hz, default 440.
    pub const FREQUENCY: Self = Self::new(0.0, 440.0, 20000.0);
    /// Gate, default off.
    pub const GATE: Self = Self::new(0.0, 0.0, 1.0);
    /// Duration in seconds.
    pub const fn seconds(default: f32) -> Self {
        Self::new(0.0, default, 8.0)
    }
}

/// One entry of a [`PortLayout`].
#[derive(Clone)]
pub(crate) enum PortSpec {
    Input {
        name: &'static str,
        parts: usize,
        range: PortRange,
        gate: bool,
    },
    Output {
        name: &'static str,
        parts: usize,
    },
    Variable {
        name: &'static str,
        initial: f32,
    },
    Queue {
        name: &'static str,
        channels: usize,
    },
    Function {
        name: &'static str,
        function: Arc<dyn Function>,
    },
    SpectralInput {
        name: &'static str,
        size: usize,
    },
    SpectralOutput {
        name: &'static str,
        size: usize,
    },
}

impl PortSpec {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Input { name, .. }
            | Self::Output { name, .. }
            | Self::Variable { name, .. }
            | Self::Queue { name, .. }
            | Self::Function { name, .. }
            | Self::SpectralInput { name, .. }
            | Self::SpectralOutput { name, .. } => name,
        }
    }

    pub(crate) fn kind(&self) -> PortKind {
        match self {
            Self::Input { .. } => PortKind::Input,
            Self::Output { .. } => PortKind::Output,
            Self::Variable { .. } => PortKind::Variable,
            Self::Queue { .. } => PortKind::Queue,
            Self::Function { .. } => PortKind::Function,
            Self::SpectralInput { .. } => PortKind::SpectralInput,
            Self::SpectralOutput { .. } => PortKind::SpectralOutput,
        }
    }
}

/// Declaration of a unit's ports, in insertion order.
///
/// Indices are assigned per kind in the order ports are declared, so the
/// first `input` is input 0 and the first `output` is output 0 regardless
/// of how they interleave.
///
/// ```rust
/// use patchbay_core::{PortLayout, PortRange};
///
/// let layout = PortLayout::new()
///     .input("Frequency", PortRange::FREQUENCY)
///     .input("Amplitude", PortRange::AMPLITUDE)
///     .output("Output");
/// assert_eq!(layout.len(), 3);
/// ```
#[derive(Clone, Default)]
pub struct PortLayout {
    pub(crate) specs: Vec<PortSpec>,
}

impl PortLayout {
    /// Empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of declared ports.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True when no ports are declared.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Single-part input.
    pub fn input(self, name: &'static str, range: PortRange) -> Self {
        self.input_parts(name, 1, range)
    }

    /// Multi-part input.
    pub fn input_parts(mut self, name: &'static str, parts: usize, range: PortRange) -> Self {
        self.specs.push(PortSpec::Input {
            name,
            parts: parts.max(1),
            range,
            gate: false,
        });
        self
    }

    /// Gate input. Behaves like an input and can carry an auto-disable target.
    pub fn gate(mut self, name: &'static str) -> Self {
        self.specs.push(PortSpec::Input {
            name,
            parts: 1,
            range: PortRange::GATE,
            gate: true,
        });
        self
    }

    /// Single-part output.
    pub fn output(self, name: &'static str) -> Self {
        self.output_parts(name, 1)
    }

    /// Multi-part output.
    pub fn output_parts(mut self, name: &'static str, parts: usize) -> Self {
        self.specs.push(PortSpec::Output {
            name,
            parts: parts.max(1),
        });
        self
    }

    /// Unit-owned scalar.
    pub fn variable(mut self, name: &'static str, initial: f32) -> Self {
        self.specs.push(PortSpec::Variable { name, initial });
        self
    }

    /// Data queue delivering frames of `channels` values.
    pub fn queue(mut self, name: &'static str, channels: usize) -> Self {
        self.specs.push(PortSpec::Queue {
            name,
            channels: channels.max(1),
        });
        self
    }

    /// Function port, initially the identity.
    pub fn function(mut self, name: &'static str) -> Self {
        self.specs.push(PortSpec::Function {
            name,
            function: Arc::new(Identity),
        });
        self
    }

    /// Spectral input of `size` bins.
    pub fn spectral_input(mut self, name: &'static str, size: usize) -> Self {
        self.specs.push(PortSpec::SpectralInput { name, size });
        self
    }

    /// Spectral output of `size` bins.
    pub fn spectral_output(mut self, name: &'static str, size: usize) -> Self {
        self.specs.push(PortSpec::SpectralOutput { name, size });
        self
    }
}

/// Global address of one part of an input or output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Endpoint {
    pub port: usize,
    pub part: usize,
}

pub(crate) struct InputPart {
    pub values: Vec<f32>,
    pub held: f32,
    pub sources: Vec<Endpoint>,
}

/// Input port storage.
pub struct InputPort {
    pub(crate) name: &'static str,
    pub(crate) range: PortRange,
    pub(crate) gate: bool,
    pub(crate) auto_disable: Option<UnitId>,
    pub(crate) parts: Vec<InputPart>,
}

impl InputPort {
    pub(crate) fn new(
        name: &'static str,
        parts: usize,
        range: PortRange,
        gate: bool,
        block_size: usize,
    ) -> Self {
        Self {
            name,
            range,
            gate,
            auto_disable: None,
            parts: (0..parts)
                .map(|_| InputPart {
                    values: vec![range.default; block_size],
                    held: range.default,
                    sources: Vec::new(),
                })
                .collect(),
        }
    }

    /// Port name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Advisory range.
    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Number of parts.
    pub fn parts(&self) -> usize {
        self.parts.len()
    }

    /// True when any part has an upstream connection.
    pub fn is_connected(&self) -> bool {
        self.parts.iter().any(|p| !p.sources.is_empty())
    }

    /// Block buffer of part 0.
    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.parts[0].values
    }

    /// Block buffer of `part`.
    #[inline]
    pub fn part(&self, part: usize) -> &[f32] {
        &self.parts[part].values
    }

    /// Held scalar of part 0.
    #[inline]
    pub fn held(&self) -> f32 {
        self.parts[0].held
    }
}

pub(crate) struct OutputPart {
    pub values: Vec<f32>,
    pub targets: Vec<Endpoint>,
}

/// Output port storage.
pub struct OutputPort {
    pub(crate) name: &'static str,
    pub(crate) unit: UnitId,
    pub(crate) parts: Vec<OutputPart>,
}

impl OutputPort {
    pub(crate) fn new(name: &'static str, unit: UnitId, parts: usize, block_size: usize) -> Self {
        Self {
            name,
            unit,
            parts: (0..parts)
                .map(|_| OutputPart {
                    values: vec![0.0; block_size],
                    targets: Vec::new(),
                })
                .collect(),
        }
    }

    /// Port name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of parts.
    pub fn parts(&self) -> usize {
        self.parts.len()
    }

    /// Block buffer of part 0, for writing.
    #[inline]
    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.parts[0].values
    }

    /// Block buffer of `part`, for writing.
    #[inline]
    pub fn part_mut(&mut self, part: usize) -> &mut [f32] {
        &mut self.parts[part].values
    }

    /// Block buffer of `part`.
    #[inline]
    pub fn part(&self, part: usize) -> &[f32] {
        &self.parts[part].values
    }

    /// Holds every part at the sample last written at `index`.
    pub(crate) fn flatten(&mut self, index: usize) {
        for part in &mut self.parts {
            let value = part.values[index];
            part.values.fill(value);
        }
    }
}

/// Variable port storage.
pub struct VariablePort {
    pub(crate) name: &'static str,
    pub(crate) value: f32,
}

impl VariablePort {
    /// Current value.
    #[inline]
    pub fn get(&self) -> f32 {
        self.value
    }

    /// Replaces the value.
    #[inline]
    pub fn set(&mut self, value: f32) {
        self.value = value;
    }
}

/// Data-queue port storage.
pub struct QueuePort {
    pub(crate) name: &'static str,
    pub(crate) queue: DataQueue,
}

/// Function port storage.
pub struct FunctionPort {
    pub(crate) name: &'static str,
    pub(crate) function: Arc<dyn Function>,
}

impl FunctionPort {
    /// Current function.
    pub fn function(&self) -> &dyn Function {
        &*self.function
    }
}

/// Spectral output storage. Each published frame bumps `sequence`.
pub struct SpectralOutputPort {
    pub(crate) name: &'static str,
    pub(crate) unit: UnitId,
    pub(crate) spectrum: Spectrum,
    pub(crate) sequence: u64,
    pub(crate) targets: Vec<usize>,
}

impl SpectralOutputPort {
    /// Frame being written. Call [`publish`](Self::publish) when complete.
    pub fn spectrum_mut(&mut self) -> &mut Spectrum {
        &mut self.spectrum
    }

    /// Marks the current frame as new for connected inputs.
    pub fn publish(&mut self) {
        self.sequence += 1;
    }
}

/// Spectral input storage.
pub struct SpectralInputPort {
    pub(crate) name: &'static str,
    pub(crate) spectrum: Spectrum,
    pub(crate) source: Option<usize>,
    pub(crate) seen: u64,
    pub(crate) fresh: bool,
}

impl SpectralInputPort {
    /// The latest frame, if a new one arrived for this slice.
    pub fn fresh(&self) -> Option<&Spectrum> {
        self.fresh.then_some(&self.spectrum)
    }

    /// The latest frame received, new or not.
    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }
}

/// Per-kind arenas holding every port of every unit.
#[derive(Default)]
pub(crate) struct PortArena {
    pub inputs: Vec<InputPort>,
    pub outputs: Vec<OutputPort>,
    pub variables: Vec<VariablePort>,
    pub queues: Vec<QueuePort>,
    pub functions: Vec<FunctionPort>,
    pub spectral_inputs: Vec<SpectralInputPort>,
    pub spectral_outputs: Vec<SpectralOutputPort>,
}

impl PortArena {
    /// Sums each input part over `[start, limit)` from its sources, or fills
    /// it with the held scalar when unconnected.
    pub fn gather(&mut self, inputs: std::ops::Range<usize>, start: usize, limit: usize) {
        let outputs = &self.outputs;
        for port in &mut self.inputs[inputs] {
            for part in &mut port.parts {
                let InputPart {
                    values,
                    held,
                    sources,
                } = part;
                let dst = &mut values[start..limit];
                match sources.split_first() {
                    None => dst.fill(*held),
                    Some((first, rest)) => {
                        dst.copy_from_slice(
                            &outputs[first.port].parts[first.part].values[start..limit],
                        );
                        for src in rest {
                            let src = &outputs[src.port].parts[src.part].values[start..limit];
                            for (d, s) in dst.iter_mut().zip(src) {
                                *d += *s;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Copies newly published spectra into connected spectral inputs.
    pub fn gather_spectra(&mut self, inputs: std::ops::Range<usize>) {
        let outputs = &self.spectral_outputs;
        for port in &mut self.spectral_inputs[inputs] {
            port.fresh = false;
            let Some(src) = port.source else { continue };
            let out = &outputs[src];
            if out.sequence != port.seen {
                port.spectrum.copy_from(&out.spectrum);
                port.seen = out.sequence;
                port.fresh = true;
            }
        }
    }
}
