//! Unit arena and graph operations.
//!
//! Units live in an arena owned by the [`Synthesizer`](crate::Synthesizer)
//! and are addressed by [`UnitId`]. Units are never removed, so ids and the
//! port index ranges recorded at `add()` stay valid for the synthesizer's
//! lifetime.
//!
//! # Pull evaluation
//!
//! Each render slice gets a fresh frame-stamp. Pulling a unit checks its
//! stamp, records the new one *before* visiting upstream producers, gathers
//! its inputs and calls `generate()`. The early stamp makes diamonds and
//! feedback cycles safe: a second visit in the same slice returns at once,
//! and a unit reached again through a cycle is read with whatever its
//! buffers already hold, i.e. the previous block at those indices.
//!
//! # Circuits
//!
//! A circuit is a unit with no ports of its own. It owns an ordered child
//! list and an alias table that maps names to child ports, so code that
//! looks up ports by name cannot tell a circuit from a primitive.

mod circuit;
mod connection;
mod pull;

use std::fmt;
use std::ops::Range;

use crate::port::{PortId, PortKind};
use crate::unit::UnitGenerator;

pub use circuit::Preset;
pub(crate) use circuit::CircuitData;

/// Identifier of a unit within one synthesizer.
///
/// Allocated sequentially by [`Synthesizer::add`](crate::Synthesizer::add)
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub(crate) u32);

impl UnitId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Position in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index ranges of one unit's ports in each port arena.
#[derive(Debug, Clone, Default)]
pub(crate) struct PortRanges {
    pub inputs: Range<usize>,
    pub outputs: Range<usize>,
    pub variables: Range<usize>,
    pub queues: Range<usize>,
    pub functions: Range<usize>,
    pub spectral_inputs: Range<usize>,
    pub spectral_outputs: Range<usize>,
}

impl PortRanges {
    pub fn get(&self, kind: PortKind) -> Range<usize> {
        match kind {
            PortKind::Input => self.inputs.clone(),
            PortKind::Output => self.outputs.clone(),
            PortKind::Variable => self.variables.clone(),
            PortKind::Queue => self.queues.clone(),
            PortKind::Function => self.functions.clone(),
            PortKind::SpectralInput => self.spectral_inputs.clone(),
            PortKind::SpectralOutput => self.spectral_outputs.clone(),
        }
    }
}

pub(crate) enum UnitBody {
    Primitive(Box<dyn UnitGenerator>),
    Circuit(CircuitData),
}

/// Arena entry.
pub(crate) struct UnitSlot {
    pub type_name: &'static str,
    pub body: UnitBody,
    pub enabled: bool,
    pub owner: Option<UnitId>,
    pub last_stamp: u64,
    pub generate_count: u64,
    pub start_required: bool,
    pub started: bool,
    pub ports: PortRanges,
    /// Port names in declaration order.
    pub names: Vec<(&'static str, PortId)>,
}

impl UnitSlot {
    pub fn primitive(unit: Box<dyn UnitGenerator>, ports: PortRanges) -> Self {
        Self {
            type_name: unit.type_name(),
            start_required: unit.is_start_required(),
            body: UnitBody::Primitive(unit),
            enabled: true,
            owner: None,
            last_stamp: 0,
            generate_count: 0,
            started: false,
            ports,
            names: Vec::new(),
        }
    }

    pub fn circuit(data: CircuitData) -> Self {
        Self {
            type_name: "Circuit",
            body: UnitBody::Circuit(data),
            enabled: true,
            owner: None,
            last_stamp: 0,
            generate_count: 0,
            start_required: false,
            started: false,
            ports: PortRanges::default(),
            names: Vec::new(),
        }
    }

    pub fn circuit_data(&self) -> Option<&CircuitData> {
        match &self.body {
            UnitBody::Circuit(c) => Some(c),
            UnitBody::Primitive(_) => None,
        }
    }

    pub fn circuit_data_mut(&mut self) -> Option<&mut CircuitData> {
        match &mut self.body {
            UnitBody::Circuit(c) => Some(c),
            UnitBody::Primitive(_) => None,
        }
    }

    /// Case-insensitive lookup of a declared port.
    pub fn find_port(&self, name: &str) -> Option<PortId> {
        self.names
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
    }
}
