//! The synthesizer: unit arena, timeline and render loop.
//!
//! [`Synthesizer`] owns every unit and port. Graph construction and direct
//! parameter changes go through `&mut self` on the thread that owns it;
//! other threads talk to it through a [`SynthHandle`].
//!
//! # Rendering
//!
//! [`render`](Synthesizer::render) fills an interleaved buffer, computing
//! blocks of `block_size` frames as needed. Each block:
//!
//! 1. drains the command channel into the scheduler;
//! 2. clears the output bus;
//! 3. applies every command due at the current offset, renders up to the
//!    next due command or the block end, and repeats.
//!
//! Rendering a slice pulls every running unit in start order. Sinks such as a
//! line out accumulate into the bus, which `render` then interleaves.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::{Receiver, Sender};

use crate::bus::OutputBus;
use crate::config::SynthConfig;
use crate::error::{GraphError, ScheduleError};
use crate::event::{EngineEvent, Signal};
use crate::function::Function;
use crate::graph::{PortRanges, UnitBody, UnitId, UnitSlot};
use crate::handle::{SynthHandle, Timeline};
use crate::port::{
    FunctionPort, InputPort, OutputPort, PortArena, PortId, PortKind, PortRange, PortSpec,
    QueuePort, SpectralInputPort, SpectralOutputPort, VariablePort,
};
use crate::queue::{DataQueue, Loops, QueueCallback, QueueRequest, SequentialData};
use crate::scheduler::{Action, CommandId, Message, QueueOp, Scheduler, TimedCommand};
use crate::spectral::Spectrum;
use crate::unit::UnitGenerator;

/// A modular synthesis engine.
///
/// ```rust
/// use patchbay_core::{SynthConfig, Synthesizer};
///
/// let mut synth = Synthesizer::new(SynthConfig::default().block_size(32));
/// synth.start();
/// let mut out = vec![1.0; 64 * 2];
/// synth.render(&mut out);
/// assert!(out.iter().all(|&s| s == 0.0));
/// assert_eq!(synth.current_frame(), 64);
/// ```
pub struct Synthesizer {
    pub(crate) config: SynthConfig,
    pub(crate) units: Vec<UnitSlot>,
    pub(crate) ports: PortArena,
    pub(crate) bus: OutputBus,
    pub(crate) signals: Vec<Signal>,
    pub(crate) scheduler: Scheduler,
    /// Units pulled every slice, in start order.
    pub(crate) running: Vec<UnitId>,
    /// Index of the last computed sample, held when a unit is disabled.
    pub(crate) flatten_index: usize,
    /// Absolute frame of index 0 of the current block.
    pub(crate) frame: u64,
    stamp: u64,
    engine_running: bool,
    bus_cursor: usize,
    timeline: Arc<Timeline>,
    command_tx: Sender<Message>,
    command_rx: Receiver<Message>,
    event_tx: Sender<EngineEvent>,
    event_rx: Receiver<EngineEvent>,
}

impl Synthesizer {
    /// Creates an idle synthesizer. Out-of-range config fields are clamped.
    pub fn new(config: SynthConfig) -> Self {
        let config = config.sanitized();
        let (command_tx, command_rx) = crossbeam_channel::bounded(config.command_capacity);
        let (event_tx, event_rx) = crossbeam_channel::bounded(config.event_capacity);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            channels = config.output_channels,
            "synth_new"
        );
        Self {
            units: Vec::new(),
            ports: PortArena::default(),
            bus: OutputBus::new(config.output_channels, config.block_size),
            signals: Vec::with_capacity(64),
            scheduler: Scheduler::new(config.command_capacity),
            running: Vec::new(),
            flatten_index: config.block_size - 1,
            frame: 0,
            stamp: 0,
            engine_running: false,
            bus_cursor: config.block_size,
            timeline: Arc::new(Timeline::new()),
            command_tx,
            command_rx,
            event_tx,
            event_rx,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Frames per second.
    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Frame at the start of the next block to render.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// [`current_frame`](Self::current_frame) in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / f64::from(self.config.sample_rate)
    }

    /// Handle for scheduling from other threads.
    pub fn handle(&self) -> SynthHandle {
        SynthHandle::new(
            self.command_tx.clone(),
            Arc::clone(&self.timeline),
            self.config.sample_rate,
        )
    }

    /// Receiver of engine notifications.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.event_rx.clone()
    }

    // --- Units ---

    /// Adds a unit and returns its id.
    pub fn add<U: UnitGenerator>(&mut self, unit: U) -> UnitId {
        self.add_boxed(Box::new(unit))
    }

    /// Adds an already boxed unit.
    pub fn add_boxed(&mut self, mut unit: Box<dyn UnitGenerator>) -> UnitId {
        let id = UnitId(self.units.len() as u32);
        unit.set_sample_rate(self.config.sample_rate);
        let layout = unit.layout();
        let block = self.config.block_size;

        let ports = &mut self.ports;
        let mut ranges = PortRanges {
            inputs: ports.inputs.len()..ports.inputs.len(),
            outputs: ports.outputs.len()..ports.outputs.len(),
            variables: ports.variables.len()..ports.variables.len(),
            queues: ports.queues.len()..ports.queues.len(),
            functions: ports.functions.len()..ports.functions.len(),
            spectral_inputs: ports.spectral_inputs.len()..ports.spectral_inputs.len(),
            spectral_outputs: ports.spectral_outputs.len()..ports.spectral_outputs.len(),
        };
        let mut names = Vec::with_capacity(layout.len());
        for spec in layout.specs {
            let name = spec.name();
            let kind = spec.kind();
            let index = ranges.get(kind).len();
            match spec {
                PortSpec::Input {
                    parts, range, gate, ..
                } => {
                    ports
                        .inputs
                        .push(InputPort::new(name, parts, range, gate, block));
                    ranges.inputs.end += 1;
                }
                PortSpec::Output { parts, .. } => {
                    ports.outputs.push(OutputPort::new(name, id, parts, block));
                    ranges.outputs.end += 1;
                }
                PortSpec::Variable { initial, .. } => {
                    ports.variables.push(VariablePort {
                        name,
                        value: initial,
                    });
                    ranges.variables.end += 1;
                }
                PortSpec::Queue { channels, .. } => {
                    ports.queues.push(QueuePort {
                        name,
                        queue: DataQueue::new(channels, self.config.queue_capacity),
                    });
                    ranges.queues.end += 1;
                }
                PortSpec::Function { function, .. } => {
                    ports.functions.push(FunctionPort { name, function });
                    ranges.functions.end += 1;
                }
                PortSpec::SpectralInput { size, .. } => {
                    ports.spectral_inputs.push(SpectralInputPort {
                        name,
                        spectrum: Spectrum::new(size),
                        source: None,
                        seen: 0,
                        fresh: false,
                    });
                    ranges.spectral_inputs.end += 1;
                }
                PortSpec::SpectralOutput { size, .. } => {
                    ports.spectral_outputs.push(SpectralOutputPort {
                        name,
                        unit: id,
                        spectrum: Spectrum::new(size),
                        sequence: 0,
                        targets: Vec::new(),
                    });
                    ranges.spectral_outputs.end += 1;
                }
            }
            names.push((name, PortId::new(id, kind, index)));
        }

        let mut slot = UnitSlot::primitive(unit, ranges);
        slot.names = names;
        #[cfg(feature = "tracing")]
        tracing::debug!(unit = %id, kind = slot.type_name, "synth_add");
        self.units.push(slot);
        self.running.reserve(1);
        id
    }

    /// Number of units, circuits included.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Diagnostic type name of a unit.
    pub fn type_name(&self, unit: UnitId) -> Result<&'static str, GraphError> {
        Ok(self.slot(unit)?.type_name)
    }

    /// Borrows a primitive unit as its concrete type.
    pub fn unit_ref<T: UnitGenerator>(&self, unit: UnitId) -> Option<&T> {
        match &self.units.get(unit.index())?.body {
            UnitBody::Primitive(u) => {
                let any: &dyn Any = &**u;
                any.downcast_ref::<T>()
            }
            UnitBody::Circuit(_) => None,
        }
    }

    /// Mutably borrows a primitive unit as its concrete type.
    pub fn unit_mut<T: UnitGenerator>(&mut self, unit: UnitId) -> Option<&mut T> {
        match &mut self.units.get_mut(unit.index())?.body {
            UnitBody::Primitive(u) => {
                let any: &mut dyn Any = &mut **u;
                any.downcast_mut::<T>()
            }
            UnitBody::Circuit(_) => None,
        }
    }

    /// How many times `generate()` has run for `unit`.
    pub fn generate_count(&self, unit: UnitId) -> Option<u64> {
        self.units.get(unit.index()).map(|s| s.generate_count)
    }

    pub(crate) fn slot(&self, unit: UnitId) -> Result<&UnitSlot, GraphError> {
        self.units
            .get(unit.index())
            .ok_or(GraphError::UnitNotFound(unit))
    }

    pub(crate) fn check(&self, unit: UnitId) -> Result<(), GraphError> {
        self.slot(unit).map(|_| ())
    }

    /// Arena index of `port`, checking it has the expected kind.
    pub(crate) fn resolve(&self, port: PortId, kind: PortKind) -> Result<usize, GraphError> {
        let slot = self.slot(port.unit())?;
        if port.kind() != kind {
            return Err(GraphError::WrongPortKind {
                port,
                expected: kind,
                found: port.kind(),
            });
        }
        let range = slot.ports.get(kind);
        if port.index() >= range.len() {
            return Err(GraphError::PortNotFound(port));
        }
        Ok(range.start + port.index())
    }

    fn check_input_part(&self, port: PortId, part: usize) -> Result<usize, GraphError> {
        let g = self.resolve(port, PortKind::Input)?;
        let parts = self.ports.inputs[g].parts();
        if part >= parts {
            return Err(GraphError::PartOutOfRange { port, part, parts });
        }
        Ok(g)
    }

    // --- Parameters ---

    /// Sets the held value of an input (part 0) or a variable.
    ///
    /// Takes effect from the next sample rendered.
    pub fn set(&mut self, port: PortId, value: f32) -> Result<(), GraphError> {
        self.set_part(port, 0, value)
    }

    /// Sets the held value of one part of an input, or a variable (part 0).
    pub fn set_part(&mut self, port: PortId, part: usize, value: f32) -> Result<(), GraphError> {
        match port.kind() {
            PortKind::Variable => {
                let g = self.resolve(port, PortKind::Variable)?;
                if part != 0 {
                    return Err(GraphError::PartOutOfRange {
                        port,
                        part,
                        parts: 1,
                    });
                }
                self.ports.variables[g].value = value;
            }
            _ => {
                let g = self.check_input_part(port, part)?;
                self.ports.inputs[g].parts[part].held = value;
            }
        }
        Ok(())
    }

    /// Schedules [`set`](Self::set) at an absolute frame.
    pub fn set_at(&mut self, port: PortId, value: f32, frame: u64) -> Result<CommandId, GraphError> {
        self.set_part_at(port, 0, value, frame)
    }

    /// Schedules [`set_part`](Self::set_part) at an absolute frame.
    pub fn set_part_at(
        &mut self,
        port: PortId,
        part: usize,
        value: f32,
        frame: u64,
    ) -> Result<CommandId, GraphError> {
        match port.kind() {
            PortKind::Variable => {
                self.resolve(port, PortKind::Variable)?;
            }
            _ => {
                self.check_input_part(port, part)?;
            }
        }
        self.schedule(frame, Action::Set { port, part, value })
    }

    /// Current held value of an input (part 0), a variable, or the last
    /// computed sample of an output.
    pub fn get(&self, port: PortId) -> Result<f32, GraphError> {
        match port.kind() {
            PortKind::Variable => {
                Ok(self.ports.variables[self.resolve(port, PortKind::Variable)?].value)
            }
            PortKind::Output => {
                let g = self.resolve(port, PortKind::Output)?;
                Ok(self.ports.outputs[g].part(0)[self.flatten_index])
            }
            _ => Ok(self.ports.inputs[self.resolve(port, PortKind::Input)?].held()),
        }
    }

    /// Records the advisory range of an input.
    pub fn setup(&mut self, port: PortId, range: PortRange) -> Result<(), GraphError> {
        let g = self.resolve(port, PortKind::Input)?;
        self.ports.inputs[g].range = range;
        Ok(())
    }

    /// Advisory range of an input.
    pub fn range(&self, port: PortId) -> Result<PortRange, GraphError> {
        Ok(self.ports.inputs[self.resolve(port, PortKind::Input)?].range)
    }

    /// Block buffer of one part of an input (as summed) or an output.
    pub fn values(&self, port: PortId, part: usize) -> Result<&[f32], GraphError> {
        let parts = match port.kind() {
            PortKind::Output => &self.ports.outputs[self.resolve(port, PortKind::Output)?].parts,
            _ => {
                let g = self.check_input_part(port, part)?;
                return Ok(self.ports.inputs[g].part(part));
            }
        };
        parts
            .get(part)
            .map(|p| p.values.as_slice())
            .ok_or(GraphError::PartOutOfRange {
                port,
                part,
                parts: parts.len(),
            })
    }

    /// Sets the unit a gate input disables when its unit finishes.
    ///
    /// Only ports declared with [`PortLayout::gate`](crate::PortLayout::gate) accept a target.
    pub fn set_auto_disable(
        &mut self,
        gate: PortId,
        target: Option<UnitId>,
    ) -> Result<(), GraphError> {
        let g = self.resolve(gate, PortKind::Input)?;
        if !self.ports.inputs[g].gate {
            return Err(GraphError::NotAGate(gate));
        }
        if let Some(t) = target {
            self.slot(t)?;
        }
        self.ports.inputs[g].auto_disable = target;
        Ok(())
    }

    /// Replaces the function held by a function port.
    pub fn set_function(
        &mut self,
        port: PortId,
        function: Arc<dyn Function>,
    ) -> Result<(), GraphError> {
        let g = self.resolve(port, PortKind::Function)?;
        self.ports.functions[g].function = function;
        Ok(())
    }

    /// Schedules [`set_function`](Self::set_function) at an absolute frame.
    pub fn set_function_at(
        &mut self,
        port: PortId,
        function: Arc<dyn Function>,
        frame: u64,
    ) -> Result<CommandId, GraphError> {
        self.resolve(port, PortKind::Function)?;
        self.schedule(frame, Action::SetFunction { port, function })
    }

    // --- Data queues ---

    /// Queues `frames` frames of `data` from `start`, played once after
    /// anything already queued. Returns false if the queue was full.
    pub fn queue(
        &mut self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        start: usize,
        frames: usize,
    ) -> Result<bool, GraphError> {
        self.queue_request(port, QueueRequest::new(data).range(start, frames))
    }

    /// Like [`queue`](Self::queue), repeated according to `loops`.
    pub fn queue_loop(
        &mut self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        start: usize,
        frames: usize,
        loops: Loops,
    ) -> Result<bool, GraphError> {
        self.queue_request(
            port,
            QueueRequest::new(data).range(start, frames).loops(loops),
        )
    }

    /// Queues a fully specified request.
    pub fn queue_request(
        &mut self,
        port: PortId,
        request: QueueRequest,
    ) -> Result<bool, GraphError> {
        let g = self.resolve(port, PortKind::Queue)?;
        Ok(self.ports.queues[g].queue.push(request))
    }

    /// Note-on: plays `data` into its sustain loop, replacing the queue.
    pub fn queue_on(
        &mut self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
    ) -> Result<bool, GraphError> {
        let g = self.resolve(port, PortKind::Queue)?;
        Ok(self.ports.queues[g].queue.queue_on(data, callback))
    }

    /// Note-off: queues the part of `data` after its sustain loop.
    pub fn queue_off(
        &mut self,
        port: PortId,
        data: Arc<dyn SequentialData>,
        callback: Option<Arc<dyn QueueCallback>>,
    ) -> Result<bool, GraphError> {
        let g = self.resolve(port, PortKind::Queue)?;
        Ok(self.ports.queues[g].queue.queue_off(data, callback))
    }

    /// Empties a data-queue port.
    pub fn clear_queue(&mut self, port: PortId) -> Result<(), GraphError> {
        let g = self.resolve(port, PortKind::Queue)?;
        self.ports.queues[g].queue.clear();
        Ok(())
    }

    /// Schedules a queue request at an absolute frame.
    pub fn queue_at(
        &mut self,
        port: PortId,
        request: QueueRequest,
        frame: u64,
    ) -> Result<CommandId, GraphError> {
        self.resolve(port, PortKind::Queue)?;
        self.schedule(
            frame,
            Action::Queue {
                port,
                op: QueueOp::Request(request),
            },
        )
    }

    /// True while a data-queue port has something playing or waiting.
    pub fn queue_has_data(&self, port: PortId) -> Result<bool, GraphError> {
        Ok(self.ports.queues[self.resolve(port, PortKind::Queue)?]
            .queue
            .has_data())
    }

    // --- Lifecycle ---

    /// Starts the engine. Rendering produces silence until this is called.
    ///
    /// Start-required units that were never started (and have no pending
    /// start) are reported with a warning.
    pub fn start(&mut self) {
        #[cfg(feature = "tracing")]
        for unit in self.unstarted_sinks() {
            tracing::warn!(
                unit = %unit,
                kind = self.units[unit.index()].type_name,
                "unit must be started to produce output but was never started"
            );
        }
        self.engine_running = true;
        #[cfg(feature = "tracing")]
        tracing::debug!(frame = self.frame, "engine_start");
    }

    /// Stops the engine. The timeline halts; `render` produces silence.
    pub fn stop(&mut self) {
        self.engine_running = false;
        #[cfg(feature = "tracing")]
        tracing::debug!(frame = self.frame, "engine_stop");
    }

    /// True between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_started(&self) -> bool {
        self.engine_running
    }

    /// Start-required units that were never started and have no pending
    /// start.
    pub fn unstarted_sinks(&self) -> Vec<UnitId> {
        self.units
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start_required && !s.started)
            .map(|(i, _)| UnitId(i as u32))
            .filter(|id| !self.scheduler.has_pending_start(*id))
            .collect()
    }

    /// Starts `unit` now: it is enabled and pulled every slice.
    pub fn start_unit(&mut self, unit: UnitId) -> Result<(), GraphError> {
        self.check(unit)?;
        self.start_now(unit);
        Ok(())
    }

    /// Disables `unit` now and schedules its start at `frame`.
    ///
    /// When the command queue is full nothing changes and
    /// [`ScheduleError::QueueFull`] is returned.
    pub fn start_unit_at(&mut self, unit: UnitId, frame: u64) -> Result<CommandId, GraphError> {
        self.check(unit)?;
        let id = self.schedule(frame, Action::Start(unit))?;
        self.set_enabled_now(unit, false);
        Ok(id)
    }

    /// Stops `unit` now and withdraws its own pending starts and stops.
    pub fn stop_unit(&mut self, unit: UnitId) -> Result<(), GraphError> {
        self.check(unit)?;
        self.drain_commands();
        let _purged = self.scheduler.purge_lifecycle(unit);
        #[cfg(feature = "tracing")]
        if _purged > 0 {
            tracing::debug!(unit = %unit, purged = _purged, "stop purged pending lifecycle commands");
        }
        self.stop_now(unit);
        Ok(())
    }

    /// Schedules a stop of `unit` at `frame`.
    pub fn stop_unit_at(&mut self, unit: UnitId, frame: u64) -> Result<CommandId, GraphError> {
        self.check(unit)?;
        self.schedule(frame, Action::Stop(unit))
    }

    /// Enables or disables `unit` now. Disabled units hold their outputs.
    pub fn set_enabled(&mut self, unit: UnitId, enabled: bool) -> Result<(), GraphError> {
        self.check(unit)?;
        self.set_enabled_now(unit, enabled);
        Ok(())
    }

    /// Schedules [`set_enabled`](Self::set_enabled) at `frame`.
    pub fn set_enabled_at(
        &mut self,
        unit: UnitId,
        enabled: bool,
        frame: u64,
    ) -> Result<CommandId, GraphError> {
        self.check(unit)?;
        self.schedule(frame, Action::Enable(unit, enabled))
    }

    /// Whether `unit` is enabled.
    pub fn is_enabled(&self, unit: UnitId) -> Result<bool, GraphError> {
        Ok(self.slot(unit)?.enabled)
    }

    /// Whether `unit` is in the running list.
    pub fn is_running(&self, unit: UnitId) -> bool {
        self.running.contains(&unit)
    }

    /// Withdraws a scheduled command. Returns whether it was still pending.
    pub fn cancel(&mut self, id: CommandId) -> bool {
        self.drain_commands();
        self.scheduler.cancel(id)
    }

    /// Number of scheduled commands not yet fired.
    pub fn pending_commands(&self) -> usize {
        self.scheduler.len()
    }

    fn schedule(&mut self, frame: u64, action: Action) -> Result<CommandId, GraphError> {
        self.drain_commands();
        let id = self.timeline.allocate_id();
        if self.scheduler.push(TimedCommand { id, frame, action }) {
            Ok(id)
        } else {
            Err(ScheduleError::QueueFull.into())
        }
    }

    pub(crate) fn start_now(&mut self, unit: UnitId) {
        if !self.running.contains(&unit) {
            self.running.push(unit);
        }
        self.mark_started(unit);
        self.set_enabled_now(unit, true);
        #[cfg(feature = "tracing")]
        tracing::debug!(unit = %unit, frame = self.frame, "unit_start");
    }

    pub(crate) fn stop_now(&mut self, unit: UnitId) {
        self.running.retain(|u| *u != unit);
        self.set_enabled_now(unit, false);
        #[cfg(feature = "tracing")]
        tracing::debug!(unit = %unit, frame = self.frame, "unit_stop");
    }

    fn mark_started(&mut self, unit: UnitId) {
        self.units[unit.index()].started = true;
        for k in 0..self.child_count(unit) {
            if let Some(child) = self.child_at(unit, k) {
                self.mark_started(child);
            }
        }
    }

    /// Enables or disables a unit and, for circuits, every descendant.
    /// Disabling holds outputs at the last computed sample.
    pub(crate) fn set_enabled_now(&mut self, unit: UnitId, enabled: bool) {
        for k in 0..self.child_count(unit) {
            if let Some(child) = self.child_at(unit, k) {
                self.set_enabled_now(child, enabled);
            }
        }
        let slot = &mut self.units[unit.index()];
        if slot.enabled == enabled {
            return;
        }
        slot.enabled = enabled;
        if !enabled {
            for o in slot.ports.outputs.clone() {
                self.ports.outputs[o].flatten(self.flatten_index);
            }
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(unit = %unit, enabled, "unit_enable");
    }

    // --- Rendering ---

    /// Fills `output` with interleaved frames, `output_channels` wide.
    ///
    /// Produces silence without advancing time while the engine is stopped.
    pub fn render(&mut self, output: &mut [f32]) {
        if !self.engine_running {
            output.fill(0.0);
            return;
        }
        let block = self.config.block_size;
        let channels = self.config.output_channels;
        for frame in output.chunks_mut(channels) {
            if self.bus_cursor >= block {
                self.process_block();
                self.bus_cursor = 0;
            }
            for (c, sample) in frame.iter_mut().enumerate() {
                *sample = self.bus.channel(c)[self.bus_cursor];
            }
            self.bus_cursor += 1;
        }
    }

    /// Renders exactly one block and returns the output bus.
    ///
    /// Any frames of the previous block not yet read by
    /// [`render`](Self::render) are discarded.
    pub fn render_block(&mut self) -> &OutputBus {
        if self.engine_running {
            self.process_block();
        } else {
            self.bus.clear();
        }
        self.bus_cursor = self.config.block_size;
        &self.bus
    }

    fn drain_commands(&mut self) {
        while let Ok(message) = self.command_rx.try_recv() {
            match message {
                Message::Schedule(command) => {
                    // A start sent from another thread holds the unit off
                    // until its frame, as `start_unit_at` does.
                    let pending_start = match command.action {
                        Action::Start(unit) if command.frame > self.frame => Some(unit),
                        _ => None,
                    };
                    if self.scheduler.push(command) {
                        if let Some(unit) = pending_start.filter(|u| self.check(*u).is_ok()) {
                            self.set_enabled_now(unit, false);
                        }
                    }
                }
                Message::Cancel(id) => {
                    self.scheduler.cancel(id);
                }
            }
        }
    }

    fn process_block(&mut self) {
        self.drain_commands();
        self.bus.clear();
        let block = self.config.block_size;
        let block_start = self.frame;
        let block_end = block_start + block as u64;
        let mut offset = 0;
        while offset < block {
            self.flatten_index = offset.checked_sub(1).unwrap_or(block - 1);
            let now = block_start + offset as u64;
            while let Some(command) = self.scheduler.pop_due(now) {
                self.apply(command.action);
            }
            let limit = match self.scheduler.next_frame() {
                Some(f) if f < block_end => (f - block_start) as usize,
                _ => block,
            };
            self.render_slice(offset, limit);
            offset = limit;
        }
        self.frame = block_end;
        self.flatten_index = block - 1;
        self.timeline.frame.store(self.frame, Ordering::Release);
    }

    fn render_slice(&mut self, start: usize, limit: usize) {
        self.stamp += 1;
        let stamp = self.stamp;
        for i in 0..self.running.len() {
            let unit = self.running[i];
            self.pull(unit, stamp, start, limit);
        }
        self.flatten_index = limit - 1;
        self.resolve_signals(limit);
    }

    fn resolve_signals(&mut self, limit: usize) {
        if self.signals.is_empty() {
            return;
        }
        let mut signals = std::mem::take(&mut self.signals);
        let frame = self.frame + limit as u64;
        for signal in signals.drain(..) {
            let event = match signal {
                Signal::Finished { unit, gate } => {
                    let disabled = gate.and_then(|g| self.ports.inputs[g].auto_disable);
                    if let Some(target) = disabled {
                        self.set_enabled_now(target, false);
                        #[cfg(feature = "tracing")]
                        tracing::debug!(unit = %unit, target = %target, frame, "auto_disable");
                    }
                    EngineEvent::UnitFinished {
                        unit,
                        disabled,
                        frame,
                    }
                }
                Signal::Starved { port } => EngineEvent::QueueStarved { port, frame },
            };
            if self.event_tx.try_send(event).is_err() {
                #[cfg(feature = "tracing")]
                tracing::warn!(?event, "event channel full, notification dropped");
            }
        }
        self.signals = signals;
    }

    fn apply(&mut self, action: Action) {
        let result = match action {
            Action::Set { port, part, value } => self.set_part(port, part, value),
            Action::Start(unit) => self.check(unit).map(|()| self.start_now(unit)),
            Action::Stop(unit) => self.check(unit).map(|()| self.stop_now(unit)),
            Action::Enable(unit, enabled) => self
                .check(unit)
                .map(|()| self.set_enabled_now(unit, enabled)),
            Action::Queue { port, op } => self.resolve(port, PortKind::Queue).map(|g| {
                let queue = &mut self.ports.queues[g].queue;
                match op {
                    QueueOp::Request(request) => {
                        queue.push(request);
                    }
                    QueueOp::On(data, callback) => {
                        queue.queue_on(data, callback);
                    }
                    QueueOp::Off(data, callback) => {
                        queue.queue_off(data, callback);
                    }
                    QueueOp::Clear => queue.clear(),
                }
            }),
            Action::SetFunction { port, function } => self.set_function(port, function),
        };
        if let Err(_err) = result {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, "scheduled command dropped");
        }
    }
}
