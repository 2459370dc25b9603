//! Error types for graph construction and command scheduling.
//!
//! Construction problems surface as [`GraphError`] at the call that caused
//! them. Nothing on the render path returns an error: commands that turn out
//! to be invalid when they fire are logged and dropped.

use thiserror::Error;

use crate::graph::UnitId;
use crate::port::{PortId, PortKind};

/// Errors raised while building or rewiring the unit graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The unit id does not belong to this synthesizer.
    #[error("unit {0} not found")]
    UnitNotFound(UnitId),
    /// The port id does not resolve to a port on its unit.
    #[error("port {0} not found")]
    PortNotFound(PortId),
    /// The port exists but is the wrong kind for this operation.
    #[error("port {port} is {found:?}, expected {expected:?}")]
    WrongPortKind {
        /// Offending port.
        port: PortId,
        /// Kind the operation needs.
        expected: PortKind,
        /// Kind the port actually has.
        found: PortKind,
    },
    /// A part index beyond the port's part count.
    #[error("part {part} out of range for port {port} with {parts} parts")]
    PartOutOfRange {
        /// Offending port.
        port: PortId,
        /// Requested part.
        part: usize,
        /// Number of parts the port has.
        parts: usize,
    },
    /// Whole-port connection between ports with different part counts.
    #[error("cannot connect {source_port} ({source_parts} parts) to {target} ({target_parts} parts)")]
    PartCountMismatch {
        /// Output side.
        source_port: PortId,
        /// Parts on the output side.
        source_parts: usize,
        /// Input side.
        target: PortId,
        /// Parts on the input side.
        target_parts: usize,
    },
    /// Spectral ports disagree on frame size.
    #[error("spectral size mismatch: {source_size} bins into {target_size}")]
    SpectrumSizeMismatch {
        /// Bins produced by the source.
        source_size: usize,
        /// Bins expected by the target.
        target_size: usize,
    },
    /// The unit already belongs to a circuit.
    #[error("unit {unit} is already owned by circuit {owner}")]
    AlreadyOwned {
        /// Unit being added.
        unit: UnitId,
        /// Its current owner.
        owner: UnitId,
    },
    /// Adding the child would make a circuit contain itself.
    #[error("adding {child} to {circuit} would create an ownership cycle")]
    OwnershipCycle {
        /// Receiving circuit.
        circuit: UnitId,
        /// Unit being added.
        child: UnitId,
    },
    /// The unit is a primitive, not a circuit.
    #[error("unit {0} is not a circuit")]
    NotACircuit(UnitId),
    /// The unit or port is not inside the given circuit.
    #[error("unit {unit} is not a child of circuit {circuit}")]
    NotAChild {
        /// Circuit searched.
        circuit: UnitId,
        /// Unit that was expected inside it.
        unit: UnitId,
    },
    /// A port or alias name is already taken in this namespace.
    #[error("duplicate port name \"{0}\"")]
    DuplicateName(String),
    /// No port or alias with that name.
    #[error("unit {unit} has no port named \"{name}\"")]
    UnknownPortName {
        /// Unit searched.
        unit: UnitId,
        /// Name requested.
        name: String,
    },
    /// Auto-disable targets can only be attached to gate inputs.
    #[error("port {0} is not a gate")]
    NotAGate(PortId),
    /// A timed command could not be scheduled.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Errors raised when handing a command to the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// The bounded command queue is full; the command was not sent.
    #[error("command queue is full")]
    QueueFull,
    /// The synthesizer has been dropped.
    #[error("synthesizer is gone")]
    Disconnected,
}

impl<T> From<crossbeam_channel::TrySendError<T>> for ScheduleError {
    fn from(err: crossbeam_channel::TrySendError<T>) -> Self {
        match err {
            crossbeam_channel::TrySendError::Full(_) => Self::QueueFull,
            crossbeam_channel::TrySendError::Disconnected(_) => Self::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = GraphError::UnknownPortName {
            unit: UnitId::from_raw(3),
            name: "cutoff".into(),
        };
        assert_eq!(err.to_string(), "unit #3 has no port named \"cutoff\"");
        assert_eq!(
            GraphError::DuplicateName("Freq".into()).to_string(),
            "duplicate port name \"Freq\""
        );
    }

    #[test]
    fn try_send_errors_map() {
        let (tx, rx) = crossbeam_channel::bounded::<u8>(1);
        tx.try_send(1).unwrap();
        let full: ScheduleError = tx.try_send(2).unwrap_err().into();
        assert_eq!(full, ScheduleError::QueueFull);
        drop(rx);
        let gone: ScheduleError = tx.try_send(3).unwrap_err().into();
        assert_eq!(gone, ScheduleError::Disconnected);
    }
}
