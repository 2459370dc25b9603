//! Audio sink into the engine output bus.

use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};

/// Stereo output.
///
/// Part 0 of `Input` goes to the left bus channel and part 1 to the right.
/// A line out does nothing until it is started.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineOut;

impl LineOut {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;

    /// Creates a line out.
    pub fn new() -> Self {
        Self
    }
}

impl UnitGenerator for LineOut {
    fn layout(&self) -> PortLayout {
        PortLayout::new().input_parts("Input", 2, PortRange::SIGNAL)
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        for channel in 0..2 {
            let input = io.inputs.part(Self::INPUT, channel);
            io.bus.accumulate(channel, start, &input[start..limit]);
        }
    }

    fn is_start_required(&self) -> bool {
        true
    }
}
