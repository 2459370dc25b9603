//! Host-supplied transfer functions carried by function ports.

/// A stateless mapping applied per sample.
///
/// Closures implement it:
///
/// ```rust
/// use patchbay_core::Function;
///
/// let cube = |x: f32| x * x * x;
/// assert_eq!(cube.evaluate(2.0), 8.0);
/// ```
pub trait Function: Send + Sync {
    /// Maps one input value.
    fn evaluate(&self, input: f32) -> f32;
}

impl<F> Function for F
where
    F: Fn(f32) -> f32 + Send + Sync,
{
    #[inline]
    fn evaluate(&self, input: f32) -> f32 {
        self(input)
    }
}

/// Returns its input unchanged. Default content of a function port.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Function for Identity {
    #[inline]
    fn evaluate(&self, input: f32) -> f32 {
        input
    }
}

/// Piecewise-linear lookup over `[-1, 1]`, clamped at the ends.
#[derive(Debug, Clone)]
pub struct LookupTable {
    table: Vec<f32>,
}

impl LookupTable {
    /// Builds a table from evenly spaced samples spanning `[-1, 1]`.
    ///
    /// An empty table maps everything to 0.
    pub fn new(table: Vec<f32>) -> Self {
        Self { table }
    }
}

impl Function for LookupTable {
    fn evaluate(&self, input: f32) -> f32 {
        match self.table.len() {
            0 => 0.0,
            1 => self.table[0],
            n => {
                let pos = (input.clamp(-1.0, 1.0) + 1.0) * 0.5 * (n - 1) as f32;
                let i = (pos as usize).min(n - 2);
                let frac = pos - i as f32;
                crate::math::lerp(self.table[i], self.table[i + 1], frac)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_passes_through() {
        assert_eq!(Identity.evaluate(-0.3), -0.3);
    }

    #[test]
    fn lookup_interpolates_and_clamps() {
        let t = LookupTable::new(vec![-1.0, 0.0, 4.0]);
        assert_eq!(t.evaluate(0.0), 0.0);
        assert_eq!(t.evaluate(0.5), 2.0);
        assert_eq!(t.evaluate(3.0), 4.0);
        assert_eq!(t.evaluate(-3.0), -1.0);
        assert_eq!(LookupTable::new(Vec::new()).evaluate(0.5), 0.0);
    }
}
