//! Control-thread access to a running synthesizer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::Sender;

use crate::error::ScheduleError;
use crate::function::Function;
use crate::graph::UnitId;
use crate::port::PortId;
use crate::queue::{QueueCallback, QueueRequest, SequentialData};
use crate::scheduler::{Action, CommandId, Message, QueueOp, TimedCommand};

/// Shared state between a synthesizer and its handles.
pub(crate) struct Timeline {
    /// Frame at the start of the next block to render.
    pub frame: AtomicU64,
    /// Next command id.
    pub next_id: AtomicU64,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            frame: AtomicU64::new(0),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn allocate_id(&self) -> CommandId {
        CommandId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

/// Cloneable, `Send` handle for scheduling commands from other threads.
///
/// Commands travel through a bounded channel and take effect on the render
/// thread at their target frame. A command whose frame is already past
/// applies at the start of the next block.
///
/// ```rust
/// use patchbay_core::{SynthConfig, Synthesizer};
///
/// let synth = Synthesizer::new(SynthConfig::default());
/// let handle = synth.handle();
/// std::thread::spawn(move || {
///     let now = handle.current_frame();
///     assert_eq!(now, 0);
/// })
/// .join()
/// .unwrap();
/// ```
#[derive(Clone)]
pub struct SynthHandle {
    sender: Sender<Message>,
    timeline: Arc<Timeline>,
    sample_rate: f32,
}

impl SynthHandle {
    pub(crate) fn new(sender: Sender<Message>, timeline: Arc<Timeline>, sample_rate: f32) -> Self {
        Self {
            sender,
            timeline,
            sample_rate,
        }
    }

    /// Frame at the start of the block the render thread will render next.
    pub fn current_frame(&self) -> u64 {
        self.timeline.frame.load(Ordering::Acquire)
    }

    /// [`current_frame`](Self::current_frame) in seconds.
    pub fn current_time(&self) -> f64 {
        self.current_frame() as f64 / f64::from(self.sample_rate)
    }

    /// Engine sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frame `seconds` after the current frame.
    pub fn frame_after(&self, seconds: f64) -> u64 {
        self.current_frame() + libm::round(seconds.max(0.0) * f64::from(self.sample_rate)) as u64
    }

    fn send(&self, frame: u64, action: Action) -> Result<CommandId, ScheduleError> {
        let id = self.timeline.allocate_id();
        self.sender.try_send(Message::Schedule(TimedCommand { id, frame, action }))?;
        Ok(id)
    }

    /// Sets an input or variable at `frame`.
    pub fn set_at(&self, port: PortId, value: f32, frame: u64) -> Result<CommandId, ScheduleError> {
        self.set_part_at(port, 0, value, frame)
    }

    /// Sets one part of an input at `frame`.
    pub fn set_part_at(
        &self,
        port: PortId,
        part: usize,
        value: f32,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(frame, Action::Set { port, part, value })
    }

    /// Starts `unit` at `frame`.
    ///
    /// Like [`Synthesizer::start_unit_at`](crate::Synthesizer::start_unit_at),
    /// the unit is disabled as soon as the render thread receives the
    /// command and stays silent until `frame`.
    pub fn start_at(&self, unit: UnitId, frame: u64) -> Result<CommandId, ScheduleError> {
        self.send(frame, Action::Start(unit))
    }

    /// Stops `unit` at `frame`.
    pub fn stop_at(&self, unit: UnitId, frame: u64) -> Result<CommandId, ScheduleError> {
        self.send(frame, Action::Stop(unit))
    }

    /// Enables or disables `unit` at `frame`.
    pub fn set_enabled_at(
        &self,
        unit: UnitId,
        enabled: bool,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(frame, Action::Enable(unit, enabled))
    }

    /// Queues `request` on a data-queue port at `frame`.
    pub fn queue_at(
        &self,
        port: PortId,
        request: QueueRequest,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(
            frame,
            Action::Queue {
                port,
                op: QueueOp::Request(request),
            },
        )
    }

    /// Note-on for sustain-looped data at `frame`.
    pub fn queue_on_at(
        &self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(
            frame,
            Action::Queue {
                port,
                op: QueueOp::On(data, callback),
            },
        )
    }

    /// Note-off for sustain-looped data at `frame`.
    pub fn queue_off_at(
        &self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(
            frame,
            Action::Queue {
                port,
                op: QueueOp::Off(data, callback),
            },
        )
    }

    /// Empties a data-queue port at `frame`.
    pub fn clear_queue_at(&self, port: PortId, frame: u64) -> Result<CommandId, ScheduleError> {
        self.send(
            frame,
            Action::Queue {
                port,
                op: QueueOp::Clear,
            },
        )
    }

    /// Replaces the function held by a function port at `frame`.
    pub fn set_function_at(
        &self,
        port: PortId,
        function: Arc<dyn Function>,
        frame: u64,
    ) -> Result<CommandId, ScheduleError> {
        self.send(frame, Action::SetFunction { port, function })
    }

    /// Withdraws a command that has not fired yet.
    ///
    /// The cancellation is processed when the render thread next drains the
    /// channel; a command that fires in the meantime is not undone.
    pub fn cancel(&self, id: CommandId) -> Result<(), ScheduleError> {
        self.sender.try_send(Message::Cancel(id))?;
        Ok(())
    }
}
