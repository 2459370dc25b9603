//! Notifications posted by the render thread.

use crate::graph::UnitId;
use crate::port::PortId;

/// Something the host may want to react to, delivered through
/// [`Synthesizer::events`](crate::Synthesizer::events).
///
/// Posting never blocks: when the bounded channel is full the event is
/// dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A unit reached the end of its work (an envelope returning to idle).
    UnitFinished {
        /// Unit that finished.
        unit: UnitId,
        /// Unit disabled as a consequence, if its gate had a target.
        disabled: Option<UnitId>,
        /// Absolute frame at the end of the slice where it happened.
        frame: u64,
    },
    /// A data-queue port ran out of requests.
    QueueStarved {
        /// The starving port.
        port: PortId,
        /// Absolute frame at the end of the slice where it happened.
        frame: u64,
    },
}

/// Signal raised by a unit during `generate()`, resolved after the slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    Finished { unit: UnitId, gate: Option<usize> },
    Starved { port: PortId },
}
