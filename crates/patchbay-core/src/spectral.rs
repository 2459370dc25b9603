//! Complex frames exchanged between spectral ports.

/// One frame of complex bins, split into real and imaginary arrays.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Spectrum {
    /// Real parts.
    pub real: Vec<f32>,
    /// Imaginary parts.
    pub imag: Vec<f32>,
}

impl Spectrum {
    /// Zeroed frame of `size` bins.
    pub fn new(size: usize) -> Self {
        Self {
            real: vec![0.0; size],
            imag: vec![0.0; size],
        }
    }

    /// Number of bins.
    #[inline]
    pub fn len(&self) -> usize {
        self.real.len()
    }

    /// True for a zero-bin frame.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }

    /// Magnitude of bin `k`.
    pub fn magnitude(&self, k: usize) -> f32 {
        libm::hypotf(self.real[k], self.imag[k])
    }

    /// Copies bins from a frame of the same size.
    pub(crate) fn copy_from(&mut self, other: &Self) {
        self.real.copy_from_slice(&other.real);
        self.imag.copy_from_slice(&other.imag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude() {
        let mut s = Spectrum::new(2);
        s.real[1] = 3.0;
        s.imag[1] = 4.0;
        assert_eq!(s.magnitude(1), 5.0);
        assert_eq!(s.len(), 2);
    }
}
