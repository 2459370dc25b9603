//! Units that play sequential data queued on a data-queue port.

use patchbay_core::{PortLayout, PortRange, ReadStatus, UnitGenerator, UnitIo};

/// Plays sample frames from its `Data` queue without interpolation.
///
/// One queued frame is consumed per `1 / rate` output frames, where the rate
/// comes from the data (its frame rate over the engine rate). When the queue
/// runs dry the last frame is held and a
/// [`QueueStarved`](patchbay_core::EngineEvent::QueueStarved) event is
/// posted once.
///
/// | Port | Kind | Notes |
/// |------|------|-------|
/// | `Data` | queue | `channels` wide |
/// | `Amplitude` | input | default 1 |
/// | `Output` | output | `channels` parts |
#[derive(Debug, Clone)]
pub struct SampleReader {
    channels: usize,
    frame: Vec<f32>,
    /// Fractional read position; a new frame is read when it reaches 1.
    position: f32,
    rate: f32,
}

impl SampleReader {
    /// Queue index of `Data`.
    pub const DATA: usize = 0;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Reader for `channels`-wide data.
    pub fn new(channels: usize) -> Self {
        let channels = channels.max(1);
        Self {
            channels,
            frame: vec![0.0; channels],
            position: 1.0,
            rate: 1.0,
        }
    }

    /// Mono reader.
    pub fn mono() -> Self {
        Self::new(1)
    }

    /// Stereo reader.
    pub fn stereo() -> Self {
        Self::new(2)
    }
}

impl UnitGenerator for SampleReader {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .queue("Data", self.channels)
            .input("Amplitude", PortRange::new(0.0, 1.0, 1.0))
            .output_parts("Output", self.channels)
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let sample_rate = io.sample_rate;
        let amplitude = io.inputs.values(Self::AMPLITUDE);
        for i in start..limit {
            while self.position >= 1.0 {
                self.position -= 1.0;
                match io.queues.get(Self::DATA).read_frame(&mut self.frame, sample_rate) {
                    ReadStatus::Data { rate, .. } => self.rate = rate,
                    ReadStatus::Starved { first } => {
                        if first {
                            io.signals.starved(Self::DATA);
                        }
                        // Retry on the next output frame.
                        self.position = 0.0;
                        self.rate = 1.0;
                        break;
                    }
                }
            }
            for (c, v) in self.frame.iter().enumerate() {
                io.outputs.part_mut(Self::OUTPUT, c)[i] = v * amplitude[i];
            }
            self.position += self.rate;
        }
    }

    fn reset(&mut self) {
        self.frame.fill(0.0);
        self.position = 1.0;
        self.rate = 1.0;
    }
}

/// Plays a [`SegmentedEnvelope`](patchbay_core::SegmentedEnvelope) queued on
/// `Data`: each `(duration, value)` frame ramps linearly from the current
/// level to `value` over `duration` seconds.
///
/// Combine with [`queue_on`](patchbay_core::Synthesizer::queue_on) /
/// [`queue_off`](patchbay_core::Synthesizer::queue_off) for sustain and
/// release loops. The level holds when the queue runs dry.
#[derive(Debug, Clone, Default)]
pub struct EnvelopePlayer {
    level: f32,
    increment: f32,
    remaining: u32,
    segment: [f32; 2],
}

impl EnvelopePlayer {
    /// Queue index of `Data`.
    pub const DATA: usize = 0;
    /// Input index of `Amplitude`.
    pub const AMPLITUDE: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Envelope resting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level, before amplitude.
    pub fn level(&self) -> f32 {
        self.level
    }
}

impl UnitGenerator for EnvelopePlayer {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .queue("Data", 2)
            .input("Amplitude", PortRange::new(0.0, 1.0, 1.0))
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let sample_rate = io.sample_rate;
        let amplitude = io.inputs.values(Self::AMPLITUDE);
        for i in start..limit {
            if self.remaining == 0 {
                match io.queues.get(Self::DATA).read_frame(&mut self.segment, sample_rate) {
                    ReadStatus::Data { rate, .. } => {
                        let frames = (1.0 / rate).round().max(1.0) as u32;
                        self.increment = (self.segment[1] - self.level) / frames as f32;
                        self.remaining = frames;
                    }
                    ReadStatus::Starved { first } => {
                        if first {
                            io.signals.starved(Self::DATA);
                        }
                    }
                }
            }
            if self.remaining > 0 {
                self.remaining -= 1;
                self.level = if self.remaining == 0 {
                    self.segment[1]
                } else {
                    self.level + self.increment
                };
            }
            io.outputs.values_mut(Self::OUTPUT)[i] = self.level * amplitude[i];
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}
