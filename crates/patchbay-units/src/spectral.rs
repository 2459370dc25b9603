//! Bridges between the sample domain and spectral ports.
//!
//! [`SpectralFft`] collects `size` samples and publishes their transform on
//! its `Spectrum` port; [`SpectralIfft`] turns each received frame back into
//! `size` samples. Frames are not windowed or overlapped, so an FFT → IFFT
//! chain reproduces its input delayed by whole frames.

use std::sync::Arc;

use patchbay_core::{PortLayout, PortRange, UnitGenerator, UnitIo};
use rustfft::{Fft, FftPlanner, num_complex::Complex};

/// Frame size used by [`SpectralFft::default`] and [`SpectralIfft::default`].
pub const DEFAULT_FFT_SIZE: usize = 512;

/// Forward transform of consecutive, non-overlapping frames of `Input`.
pub struct SpectralFft {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    fill: usize,
}

impl SpectralFft {
    /// Input index of `Input`.
    pub const INPUT: usize = 0;
    /// Spectral output index of `Spectrum`.
    pub const SPECTRUM: usize = 0;

    /// Transform of `size` samples (at least 2).
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let fft = FftPlanner::new().plan_fft_forward(size);
        let scratch = vec![Complex::default(); fft.get_inplace_scratch_len()];
        Self {
            size,
            fft,
            buffer: vec![Complex::default(); size],
            scratch,
            fill: 0,
        }
    }

    /// Frame size.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for SpectralFft {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

impl UnitGenerator for SpectralFft {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .input("Input", PortRange::SIGNAL)
            .spectral_output("Spectrum", self.size)
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        let input = io.inputs.values(Self::INPUT);
        for &x in &input[start..limit] {
            self.buffer[self.fill] = Complex::new(x, 0.0);
            self.fill += 1;
            if self.fill == self.size {
                self.fill = 0;
                self.fft
                    .process_with_scratch(&mut self.buffer, &mut self.scratch);
                let port = io.spectral_outputs.get(Self::SPECTRUM);
                let spectrum = port.spectrum_mut();
                for (k, bin) in self.buffer.iter().enumerate() {
                    spectrum.real[k] = bin.re;
                    spectrum.imag[k] = bin.im;
                }
                port.publish();
            }
        }
    }

    fn reset(&mut self) {
        self.fill = 0;
    }
}

/// Inverse transform of frames received on `Spectrum`.
///
/// A received frame becomes the next `size` output samples once the frame
/// currently playing is finished. Without new frames the output is silent.
pub struct SpectralIfft {
    size: usize,
    ifft: Arc<dyn Fft<f32>>,
    work: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    playing: Vec<f32>,
    next: Vec<f32>,
    has_next: bool,
    cursor: usize,
}

impl SpectralIfft {
    /// Spectral input index of `Spectrum`.
    pub const SPECTRUM: usize = 0;
    /// Output index.
    pub const OUTPUT: usize = 0;

    /// Inverse transform of `size` bins (at least 2).
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        let ifft = FftPlanner::new().plan_fft_inverse(size);
        let scratch = vec![Complex::default(); ifft.get_inplace_scratch_len()];
        Self {
            size,
            ifft,
            work: vec![Complex::default(); size],
            scratch,
            playing: vec![0.0; size],
            next: vec![0.0; size],
            has_next: false,
            cursor: size,
        }
    }

    /// Frame size.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for SpectralIfft {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

impl UnitGenerator for SpectralIfft {
    fn layout(&self) -> PortLayout {
        PortLayout::new()
            .spectral_input("Spectrum", self.size)
            .output("Output")
    }

    fn generate(&mut self, io: &mut UnitIo<'_>, start: usize, limit: usize) {
        if let Some(spectrum) = io.spectral_inputs.fresh(Self::SPECTRUM) {
            for (k, bin) in self.work.iter_mut().enumerate() {
                *bin = Complex::new(spectrum.real[k], spectrum.imag[k]);
            }
            self.ifft
                .process_with_scratch(&mut self.work, &mut self.scratch);
            let scale = 1.0 / self.size as f32;
            for (n, bin) in self.next.iter_mut().zip(&self.work) {
                *n = bin.re * scale;
            }
            self.has_next = true;
        }

        let out = io.outputs.values_mut(Self::OUTPUT);
        for o in &mut out[start..limit] {
            if self.cursor == self.size {
                if self.has_next {
                    std::mem::swap(&mut self.playing, &mut self.next);
                    self.has_next = false;
                } else {
                    self.playing.fill(0.0);
                }
                self.cursor = 0;
            }
            *o = self.playing[self.cursor];
            self.cursor += 1;
        }
    }

    fn reset(&mut self) {
        self.has_next = false;
        self.cursor = self.size;
        self.playing.fill(0.0);
    }
}
