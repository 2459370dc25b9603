//! The engine's output bus, written by sink units and read by `render`.

/// Per-channel block buffers that sink units accumulate into.
///
/// Cleared at the start of every block.
pub struct OutputBus {
    channels: Vec<Vec<f32>>,
}

impl OutputBus {
    pub(crate) fn new(channels: usize, block_size: usize) -> Self {
        Self {
            channels: (0..channels).map(|_| vec![0.0; block_size]).collect(),
        }
    }

    /// Number of channels.
    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Adds `samples` into `channel` starting at `start`.
    ///
    /// Channels beyond the bus width fold onto the last channel, so a stereo
    /// sink on a mono bus sums both sides.
    pub fn accumulate(&mut self, channel: usize, start: usize, samples: &[f32]) {
        let Some(last) = self.channels.len().checked_sub(1) else {
            return;
        };
        let bus = &mut self.channels[channel.min(last)][start..start + samples.len()];
        for (b, s) in bus.iter_mut().zip(samples) {
            *b += *s;
        }
    }

    /// Block buffer of `channel`.
    pub fn channel(&self, channel: usize) -> &[f32] {
        &self.channels[channel]
    }

    pub(crate) fn clear(&mut self) {
        for ch in &mut self.channels {
            ch.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulates_and_folds() {
        let mut bus = OutputBus::new(1, 4);
        bus.accumulate(0, 1, &[1.0, 1.0]);
        bus.accumulate(1, 2, &[0.5]);
        assert_eq!(bus.channel(0), &[0.0, 1.0, 1.5, 0.0]);
        bus.clear();
        assert_eq!(bus.channel(0), &[0.0; 4]);
    }
}
