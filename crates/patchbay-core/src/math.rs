//! Math helpers shared by the runtime and the unit library.
//!
//! All functions are allocation-free and safe to call per sample.

use libm::{expf, logf};

/// Amplitude of −90 dB, the floor at which exponential stages count as silent.
pub const DB90: f64 = 3.162_277_660_168_379_4e-5;

/// Smallest ratio denominator used by ratio math.
pub const MIN_RATIO_DENOMINATOR: f32 = 1.0e-8;

/// Convert decibels to linear gain.
///
/// ```rust
/// use patchbay_core::db_to_linear;
///
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

/// Divides with the denominator clamped away from zero, keeping its sign.
#[inline]
pub fn safe_ratio(numerator: f32, denominator: f32) -> f32 {
    let d = if denominator.abs() < MIN_RATIO_DENOMINATOR {
        MIN_RATIO_DENOMINATOR.copysign(denominator)
    } else {
        denominator
    };
    numerator / d
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Phase increment in cycles per frame for `freq_hz`.
#[inline]
pub fn phase_increment(freq_hz: f32, sample_rate: f32) -> f32 {
    freq_hz / sample_rate
}

/// Replaces values below 1e-20 with zero.
#[allow(clippy::inline_always)]
#[inline(always)]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

/// Tiny offset that flips sign every call.
///
/// Added to the input of recursive filters so their state never settles into
/// the subnormal range, while averaging to zero over time.
#[derive(Debug, Clone, Copy)]
pub struct DenormalGuard {
    offset: f32,
}

impl DenormalGuard {
    const MAGNITUDE: f32 = 1.0e-18;

    /// Creates a guard starting with a positive offset.
    pub const fn new() -> Self {
        Self {
            offset: Self::MAGNITUDE,
        }
    }

    /// Returns the next offset.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.offset = -self.offset;
        self.offset
    }
}

impl Default for DenormalGuard {
    fn default() -> Self {
        Self::new()
    }
}
