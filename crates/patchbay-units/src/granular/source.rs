//! Grain sources.

use std::sync::Arc;

use core::f32::consts::TAU;

use libm::{floorf, sinf};

/// Per-grain playback parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainParams {
    /// Nominal frequency in Hz from the farm's `Frequency` input.
    pub frequency: f32,
    /// Randomized playback rate around 1.
    pub rate: f32,
    /// Engine sample rate.
    pub sample_rate: f32,
}

/// Signal inside one grain.
pub trait GrainSource: Send {
    /// Restarts the source for a new grain.
    fn start(&mut self, params: &GrainParams);

    /// Next sample.
    fn next(&mut self) -> f32;

    /// Fresh copy for another grain slot.
    fn clone_box(&self) -> Box<dyn GrainSource>;
}

/// Sine at `frequency * rate`, starting at phase 0.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineSource {
    phase: f32,
    increment: f32,
}

impl SineSource {
    /// New source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GrainSource for SineSource {
    fn start(&mut self, params: &GrainParams) {
        self.phase = 0.0;
        self.increment = params.frequency * params.rate / params.sample_rate;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let value = sinf(TAU * self.phase);
        self.phase += self.increment;
        self.phase -= floorf(self.phase);
        value
    }

    fn clone_box(&self) -> Box<dyn GrainSource> {
        Box::new(Self::new())
    }
}

/// Mono sample buffer read from the start at `rate` with linear
/// interpolation; silent past the end.
///
/// Slots share the buffer.
#[derive(Debug, Clone)]
pub struct SampleSource {
    data: Arc<[f32]>,
    position: f32,
    increment: f32,
}

impl SampleSource {
    /// Source over `data`.
    pub fn new(data: impl Into<Arc<[f32]>>) -> Self {
        Self {
            data: data.into(),
            position: 0.0,
            increment: 1.0,
        }
    }

    /// Sample frames in the buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True for an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl GrainSource for SampleSource {
    fn start(&mut self, params: &GrainParams) {
        self.position = 0.0;
        self.increment = params.rate;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let index = self.position as usize;
        let frac = self.position - index as f32;
        let value = match (self.data.get(index), self.data.get(index + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * frac,
            (Some(&a), None) => a * (1.0 - frac),
            _ => 0.0,
        };
        self.position += self.increment;
        value
    }

    fn clone_box(&self) -> Box<dyn GrainSource> {
        Box::new(Self::new(Arc::clone(&self.data)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: GrainParams = GrainParams {
        frequency: 1200.0,
        rate: 1.0,
        sample_rate: 48000.0,
    };

    #[test]
    fn sine_period_matches_frequency() {
        let mut sine = SineSource::new();
        sine.start(&PARAMS);
        let out: Vec<f32> = (0..41).map(|_| sine.next()).collect();
        assert!(out[0].abs() < 1e-6);
        assert!((out[10] - 1.0).abs() < 1e-4);
        assert!(out[40].abs() < 1e-4);
    }

    #[test]
    fn sample_interpolates_then_goes_silent() {
        let mut source = SampleSource::new(vec![0.0, 1.0, 0.0]);
        source.start(&GrainParams { rate: 0.5, ..PARAMS });
        let out: Vec<f32> = (0..8).map(|_| source.next()).collect();
        assert_eq!(&out[..5], &[0.0, 0.5, 1.0, 0.5, 0.0]);
        assert_eq!(&out[6..], &[0.0, 0.0]);
    }

    #[test]
    fn clones_share_the_buffer() {
        let source = SampleSource::new(vec![0.25; 4]);
        let mut copy = source.clone_box();
        copy.start(&PARAMS);
        assert_eq!(copy.next(), 0.25);
    }
}
