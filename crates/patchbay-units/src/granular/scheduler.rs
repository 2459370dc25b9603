//! Grain timing strategies.

use crate::rng::Xorshift32;

/// Decides how long grains last and how long slots rest between them.
pub trait GrainScheduler: Send {
    /// Duration in seconds of the next grain, given the `Duration` input.
    fn duration(&mut self, suggested: f32, rng: &mut Xorshift32) -> f32;

    /// Rest in seconds before a grain of `duration`, given `Density`
    /// in `(0, 1]`.
    fn gap(&mut self, duration: f32, density: f32, rng: &mut Xorshift32) -> f32;
}

/// Default timing: the suggested duration unchanged, and a gap drawn
/// uniformly from `[0, duration·(1 − density)/density]`.
///
/// At density 1 slots never rest; at density 0.5 a slot is busy about two
/// thirds of the time on average.
#[derive(Debug, Clone, Copy, Default)]
pub struct StochasticScheduler;

impl StochasticScheduler {
    /// Densities below this are treated as this.
    pub const MIN_DENSITY: f32 = 1.0e-3;
}

impl GrainScheduler for StochasticScheduler {
    fn duration(&mut self, suggested: f32, _rng: &mut Xorshift32) -> f32 {
        suggested
    }

    fn gap(&mut self, duration: f32, density: f32, rng: &mut Xorshift32) -> f32 {
        let density = density.clamp(Self::MIN_DENSITY, 1.0);
        let max_gap = duration * (1.0 - density) / density;
        rng.next_f32() * max_gap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_bounds() {
        let mut scheduler = StochasticScheduler;
        let mut rng = Xorshift32::new(3);
        for _ in 0..1000 {
            let gap = scheduler.gap(0.1, 0.25, &mut rng);
            assert!((0.0..0.3).contains(&gap), "{gap}");
        }
        assert_eq!(scheduler.gap(0.1, 1.0, &mut rng), 0.0);
        assert_eq!(scheduler.duration(0.05, &mut rng), 0.05);
    }

    #[test]
    fn zero_density_stays_finite() {
        let mut rng = Xorshift32::new(3);
        let gap = StochasticScheduler.gap(0.1, 0.0, &mut rng);
        assert!(gap.is_finite());
    }
}
