//! Time-ordered command queue.
//!
//! Commands carry an absolute frame. The render thread drains the command
//! channel once per block into a binary heap ordered by `(frame, id)`; ids are
//! allocated from a shared counter, so commands for the same frame apply in
//! submission order. The heap is preallocated to the configured capacity and
//! never grows: when it is full the newest command is dropped with a warning.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::sync::Arc;

use crate::function::Function;
use crate::graph::UnitId;
use crate::port::PortId;
use crate::queue::{QueueCallback, QueueRequest, SequentialData};

/// Identifies a scheduled command so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(pub(crate) u64);

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd{}", self.0)
    }
}

/// Operation on a data-queue port.
#[derive(Clone)]
pub(crate) enum QueueOp {
    Request(QueueRequest),
    On(Arc<dyn SequentialData>, Option<Arc<dyn QueueCallback>>),
    Off(Arc<dyn SequentialData>, Option<Arc<dyn QueueCallback>>),
    Clear,
}

/// What a command does when it fires.
#[derive(Clone)]
pub(crate) enum Action {
    Set {
        port: PortId,
        part: usize,
        value: f32,
    },
    Start(UnitId),
    Stop(UnitId),
    Enable(UnitId, bool),
    Queue {
        port: PortId,
        op: QueueOp,
    },
    SetFunction {
        port: PortId,
        function: Arc<dyn Function>,
    },
}

impl Action {
    /// True for start/stop of `unit`.
    fn is_lifecycle_of(&self, unit: UnitId) -> bool {
        matches!(self, Self::Start(u) | Self::Stop(u) if *u == unit)
    }
}

pub(crate) struct TimedCommand {
    pub id: CommandId,
    pub frame: u64,
    pub action: Action,
}

impl TimedCommand {
    fn key(&self) -> (u64, CommandId) {
        (self.frame, self.id)
    }
}

impl PartialEq for TimedCommand {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimedCommand {}

impl PartialOrd for TimedCommand {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimedCommand {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Message from a control thread to the render thread.
pub(crate) enum Message {
    Schedule(TimedCommand),
    Cancel(CommandId),
}

/// Pending commands, earliest first.
pub(crate) struct Scheduler {
    heap: BinaryHeap<Reverse<TimedCommand>>,
    capacity: usize,
}

impl Scheduler {
    pub fn new(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Adds a command. Returns false when full; the command is dropped.
    pub fn push(&mut self, command: TimedCommand) -> bool {
        if self.heap.len() >= self.capacity {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                id = %command.id,
                frame = command.frame,
                "scheduler full, command dropped"
            );
            return false;
        }
        self.heap.push(Reverse(command));
        true
    }

    /// Frame of the earliest pending command.
    pub fn next_frame(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(c)| c.frame)
    }

    /// Removes and returns the earliest command due at or before `frame`.
    pub fn pop_due(&mut self, frame: u64) -> Option<TimedCommand> {
        if self.next_frame()? <= frame {
            self.heap.pop().map(|Reverse(c)| c)
        } else {
            None
        }
    }

    /// Removes the command with `id`. Returns whether it was pending.
    pub fn cancel(&mut self, id: CommandId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|Reverse(c)| c.id != id);
        before != self.heap.len()
    }

    /// Removes pending start/stop commands of `unit`, leaving other units'
    /// commands and every other action of `unit` in place.
    pub fn purge_lifecycle(&mut self, unit: UnitId) -> usize {
        let before = self.heap.len();
        self.heap.retain(|Reverse(c)| !c.action.is_lifecycle_of(unit));
        before - self.heap.len()
    }

    /// True when a start of `unit` is pending.
    pub fn has_pending_start(&self, unit: UnitId) -> bool {
        self.heap
            .iter()
            .any(|Reverse(c)| matches!(c.action, Action::Start(u) if u == unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmd(id: u64, frame: u64, action: Action) -> TimedCommand {
        TimedCommand {
            id: CommandId(id),
            frame,
            action,
        }
    }

    fn start(unit: u32) -> Action {
        Action::Start(UnitId::from_raw(unit))
    }

    #[test]
    fn pops_in_frame_then_submission_order() {
        let mut s = Scheduler::new(8);
        s.push(cmd(1, 100, start(0)));
        s.push(cmd(0, 100, start(0)));
        s.push(cmd(2, 50, start(0)));
        assert_eq!(s.next_frame(), Some(50));
        assert!(s.pop_due(49).is_none());
        assert_eq!(s.pop_due(1000).map(|c| c.id), Some(CommandId(2)));
        assert_eq!(s.pop_due(1000).map(|c| c.id), Some(CommandId(0)));
        assert_eq!(s.pop_due(1000).map(|c| c.id), Some(CommandId(1)));
        assert!(s.pop_due(1000).is_none());
    }

    #[test]
    fn cancel_removes_only_target() {
        let mut s = Scheduler::new(8);
        s.push(cmd(0, 10, start(0)));
        s.push(cmd(1, 20, start(1)));
        assert!(s.cancel(CommandId(0)));
        assert!(!s.cancel(CommandId(0)));
        assert_eq!(s.len(), 1);
        assert_eq!(s.next_frame(), Some(20));
    }

    #[test]
    fn purge_keeps_other_units_and_actions() {
        let mut s = Scheduler::new(8);
        let a = UnitId::from_raw(0);
        s.push(cmd(0, 10, Action::Start(a)));
        s.push(cmd(1, 20, Action::Stop(a)));
        s.push(cmd(2, 30, Action::Enable(a, true)));
        s.push(cmd(3, 40, start(1)));
        assert!(s.has_pending_start(a));
        assert_eq!(s.purge_lifecycle(a), 2);
        assert!(!s.has_pending_start(a));
        assert!(s.has_pending_start(UnitId::from_raw(1)));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn full_heap_drops_newest() {
        let mut s = Scheduler::new(1);
        assert!(s.push(cmd(0, 10, start(0))));
        assert!(!s.push(cmd(1, 5, start(0))));
        assert_eq!(s.next_frame(), Some(10));
    }
}
