//! Grain envelopes.

use core::f32::consts::PI;

use libm::cosf;

/// Amplitude shape applied to one grain.
///
/// `start` is called when a grain begins; `next` then yields one gain per
/// frame until `is_finished`.
pub trait GrainEnvelope: Send {
    /// Begins a grain lasting `frames` frames.
    fn start(&mut self, frames: u32);

    /// Gain for the next frame.
    fn next(&mut self) -> f32;

    /// True once every frame of the grain has been produced.
    fn is_finished(&self) -> bool;

    /// Fresh copy for another grain slot.
    fn clone_box(&self) -> Box<dyn GrainEnvelope>;
}

/// Normalized position through a grain.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    frame: u32,
    frames: u32,
}

impl Cursor {
    fn start(&mut self, frames: u32) {
        self.frame = 0;
        self.frames = frames.max(1);
    }

    /// Position in `[0, 1]` of the current frame, then advances.
    #[inline]
    fn advance(&mut self) -> f32 {
        let x = if self.frames > 1 {
            self.frame as f32 / (self.frames - 1) as f32
        } else {
            0.5
        };
        self.frame += 1;
        x
    }

    fn is_finished(&self) -> bool {
        self.frame >= self.frames
    }
}

/// Hann window: `0.5 − 0.5·cos(2πx)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RaisedCosine {
    cursor: Cursor,
}

impl RaisedCosine {
    /// New envelope.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GrainEnvelope for RaisedCosine {
    fn start(&mut self, frames: u32) {
        self.cursor.start(frames);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let x = self.cursor.advance();
        0.5 - 0.5 * cosf(2.0 * PI * x)
    }

    fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }

    fn clone_box(&self) -> Box<dyn GrainEnvelope> {
        Box::new(Self::new())
    }
}

/// Parabola `4x(1 − x)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Parabolic {
    cursor: Cursor,
}

impl Parabolic {
    /// New envelope.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GrainEnvelope for Parabolic {
    fn start(&mut self, frames: u32) {
        self.cursor.start(frames);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let x = self.cursor.advance();
        4.0 * x * (1.0 - x)
    }

    fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }

    fn clone_box(&self) -> Box<dyn GrainEnvelope> {
        Box::new(Self::new())
    }
}

/// Linear rise, flat top, linear fall.
///
/// `ramp` is the fraction of the grain spent on each slope, clamped to
/// `(0, 0.5]`.
#[derive(Debug, Clone, Copy)]
pub struct Trapezoid {
    ramp: f32,
    cursor: Cursor,
}

impl Trapezoid {
    /// Envelope with slopes of `ramp` times the grain length.
    pub fn new(ramp: f32) -> Self {
        Self {
            ramp: ramp.clamp(1.0e-3, 0.5),
            cursor: Cursor::default(),
        }
    }
}

impl Default for Trapezoid {
    fn default() -> Self {
        Self::new(0.25)
    }
}

impl GrainEnvelope for Trapezoid {
    fn start(&mut self, frames: u32) {
        self.cursor.start(frames);
    }

    #[inline]
    fn next(&mut self) -> f32 {
        let x = self.cursor.advance();
        (x.min(1.0 - x) / self.ramp).min(1.0)
    }

    fn is_finished(&self) -> bool {
        self.cursor.is_finished()
    }

    fn clone_box(&self) -> Box<dyn GrainEnvelope> {
        Box::new(Self::new(self.ramp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(env: &mut dyn GrainEnvelope, frames: u32) -> Vec<f32> {
        env.start(frames);
        let mut out = Vec::new();
        while !env.is_finished() {
            out.push(env.next());
        }
        out
    }

    #[test]
    fn shapes_start_and_end_at_zero() {
        let envelopes: [Box<dyn GrainEnvelope>; 3] = [
            Box::new(RaisedCosine::new()),
            Box::new(Parabolic::new()),
            Box::new(Trapezoid::default()),
        ];
        for mut env in envelopes {
            let out = render(env.as_mut(), 101);
            assert_eq!(out.len(), 101);
            assert!(out[0].abs() < 1e-6);
            assert!(out[100].abs() < 1e-6);
            assert!((out[50] - 1.0).abs() < 1e-4, "peak {}", out[50]);
            assert!(out.iter().all(|&g| (0.0..=1.0 + 1e-6).contains(&g)));
        }
    }

    #[test]
    fn trapezoid_has_flat_top() {
        let out = render(&mut Trapezoid::new(0.1), 201);
        assert!(out[40..160].iter().all(|&g| g == 1.0));
    }

    #[test]
    fn restart_replays() {
        let mut env = Parabolic::new();
        let a = render(&mut env, 16);
        let b = render(&mut env, 16);
        assert_eq!(a, b);
    }
}
