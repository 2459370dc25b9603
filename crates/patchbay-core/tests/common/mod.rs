//! Minimal units for exercising the runtime without the unit library.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use patchbay_core::{PortLayout, PortRange, ReadStatus, UnitGenerator, UnitIo};

/// Output = input + offset. Counts `generate` calls.
pub struct Offset {
    pub offset: f32,
    pub calls: Arc<AtomicUsize>,
}

impl Offset {
    pub fn new(offset: f32) -> Self {
        Self {
            offset,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl UnitGenerator for Offset {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let input = io.inputs.values(0);
        let out = io.outputs.values_mut(0);
        for i in start..limit {
            out[i] = input[i] + self.offset;
        }
    }
}

/// Emits the absolute frame number.
pub struct FrameCounter;

impl UnitGenerator for FrameCounter {
    fn layout(&self) -> PortLayout {
        PortLayout::new().output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let frame = io.frame;
        let out = io.outputs.values_mut(0);
        for (i, o) in out.iter_mut().enumerate().take(limit).skip(start) {
            *o = (frame + i as u64) as f32;
        }
    }
}

/// Stereo sink into the output bus. Must be started.
pub struct Sink;

impl UnitGenerator for Sink {
    fn layout(&self) -> PortLayout {
        PortLayout::new().input_parts("Input", 2, PortRange::SIGNAL)
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        for c in 0..2 {
            let input = io.inputs.part(0, c);
            io.bus.accumulate(c, start, &input[start..limit]);
        }
    }

    fn is_start_required(&self) -> bool {
        true
    }
}

/// Raises "finished" after `frames` frames of a high gate.
pub struct OneShot {
    pub frames: usize,
    elapsed: usize,
    done: bool,
}

impl OneShot {
    pub fn new(frames: usize) -> Self {
        Self {
            frames,
            elapsed: 0,
            done: false,
        }
    }
}

impl UnitGenerator for OneShot {
    fn layout(&self) -> PortLayout {
        PortLayout::new().gate("Gate").output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let gate = io.inputs.values(0);
        for i in start..limit {
            let high = gate[i] > 0.0;
            if high && !self.done {
                self.elapsed += 1;
                if self.elapsed >= self.frames {
                    self.done = true;
                    io.signals.finished(0);
                }
            }
            io.outputs.values_mut(0)[i] = if high && !self.done { 1.0 } else { 0.0 };
        }
    }
}

/// Mono queue reader: one data frame per output frame.
pub struct Reader {
    frame: [f32; 1],
}

impl Reader {
    pub fn new() -> Self {
        Self { frame: [0.0] }
    }
}

impl UnitGenerator for Reader {
    fn layout(&self) -> PortLayout {
        PortLayout::new().queue("Data", 1).output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let sample_rate = io.sample_rate;
        for i in start..limit {
            if let ReadStatus::Starved { first: true } =
                io.queues.get(0).read_frame(&mut self.frame, sample_rate)
            {
                io.signals.starved(0);
            }
            io.outputs.values_mut(0)[i] = self.frame[0];
        }
    }
}
