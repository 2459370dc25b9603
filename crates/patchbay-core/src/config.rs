//! Engine configuration.

/// Sizing and timing parameters fixed when a [`Synthesizer`](crate::Synthesizer)
/// is constructed.
///
/// Every queue the render thread touches is preallocated from these
/// capacities, so steady-state rendering never grows a collection.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SynthConfig {
    /// Frames per second.
    pub sample_rate: f32,
    /// Frames per render block.
    pub block_size: usize,
    /// Width of the interleaved buffer passed to `render`.
    pub output_channels: usize,
    /// Bound on pending timestamped commands (channel and heap).
    pub command_capacity: usize,
    /// Bound on undelivered engine events.
    pub event_capacity: usize,
    /// Request slots per data-queue port.
    pub queue_capacity: usize,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 64,
            output_channels: 2,
            command_capacity: 4096,
            event_capacity: 256,
            queue_capacity: 16,
        }
    }
}

impl SynthConfig {
    /// Config with the given sample rate and defaults elsewhere.
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            ..Self::default()
        }
    }

    /// Sets the block size.
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Sets the output channel count.
    pub fn output_channels(mut self, channels: usize) -> Self {
        self.output_channels = channels;
        self
    }

    /// Converts seconds to a frame count, rounding to nearest.
    #[inline]
    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        libm::round(seconds.max(0.0) * f64::from(self.sample_rate)) as u64
    }

    /// Duration of one block in seconds.
    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / f64::from(self.sample_rate)
    }

    /// Clamps every field into a range the engine can run with.
    ///
    /// Used by [`Synthesizer::new`](crate::Synthesizer::new) so a hand-built
    /// config never produces zero-length buffers or channels. Strict range
    /// checking with errors lives in the config loader.
    pub(crate) fn sanitized(self) -> Self {
        Self {
            sample_rate: if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
                self.sample_rate
            } else {
                Self::default().sample_rate
            },
            block_size: self.block_size.max(1),
            output_channels: self.output_channels.max(1),
            command_capacity: self.command_capacity.max(1),
            event_capacity: self.event_capacity.max(1),
            queue_capacity: self.queue_capacity.max(1),
        }
    }
}
