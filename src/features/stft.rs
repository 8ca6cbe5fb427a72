//! Short-time Fourier transform
//!
//! Frames a batch of signals and converts each frame to a one-sided complex
//! spectrum. Frames are centred: each row is reflect-padded by `fft_size / 2`
//! samples on both sides, so a signal of `T` samples yields `1 + T / hop`
//! frames for even FFT sizes. The analysis window (`win_length` samples) is zero-padded
//! symmetrically to `fft_size`.
//!
//! # Example
//!
//! ```
//! use ndarray::Array2;
//! use stratum_loss::config::Resolution;
//! use stratum_loss::features::stft::Stft;
//!
//! let stft = Stft::new(Resolution::default())?;
//! let signal = Array2::<f32>::zeros((2, 4096));
//! let spec = stft.spectrogram(signal.view(), 1e-8)?;
//! assert_eq!(spec.magnitude.dim(), (2, 513, 17));
//! # Ok::<(), stratum_loss::LossError>(())
//! ```

use crate::config::Resolution;
use crate::error::{LossError, Result};
use crate::preprocessing::window::generate_window;
use ndarray::{Array3, ArrayView2, Axis};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Magnitude spectrum of one batch, with the complex spectrum kept for the
/// real and imaginary parts
///
/// All arrays are `(batch, fft_size / 2 + 1, frames)`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// `sqrt(max(re² + im², eps))`
    pub magnitude: Array3<f32>,

    spectrum: Array3<Complex<f32>>,
}

impl Spectrogram {
    /// Complex spectrum the magnitude was derived from
    pub fn complex(&self) -> &Array3<Complex<f32>> {
        &self.spectrum
    }

    /// Real part, floored at `eps`
    pub fn real(&self, eps: f32) -> Array3<f32> {
        self.spectrum.mapv(|c| c.re.max(eps))
    }

    /// Imaginary part, floored at `eps`
    pub fn imag(&self, eps: f32) -> Array3<f32> {
        self.spectrum.mapv(|c| c.im.max(eps))
    }
}

/// STFT for one fixed resolution
///
/// The window and FFT plan are built once and reused for every call.
#[derive(Clone)]
pub struct Stft {
    resolution: Resolution,
    /// Window zero-padded to `fft_size`
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl fmt::Debug for Stft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stft")
            .field("resolution", &self.resolution)
            .finish_non_exhaustive()
    }
}

impl Stft {
    /// Plan an STFT for `resolution`
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if the resolution is invalid
    /// (zero sizes, `win_length > fft_size`)
    pub fn new(resolution: Resolution) -> Result<Self> {
        resolution.validate()?;

        let fft_size = resolution.fft_size;
        let mut window = vec![0.0f32; fft_size];
        let offset = (fft_size - resolution.win_length) / 2;
        window[offset..offset + resolution.win_length]
            .copy_from_slice(&generate_window(resolution.window, resolution.win_length));

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        Ok(Self {
            resolution,
            window,
            fft,
        })
    }

    /// Resolution this transform was planned for
    pub fn resolution(&self) -> &Resolution {
        &self.resolution
    }

    /// Number of frames produced for a signal of `n_samples`
    pub fn n_frames(&self, n_samples: usize) -> usize {
        let padded = n_samples + 2 * (self.resolution.fft_size / 2);
        1 + padded.saturating_sub(self.resolution.fft_size) / self.resolution.hop_size
    }

    /// Complex STFT of every row of `signal` (`rows × samples`)
    ///
    /// # Returns
    ///
    /// Complex spectra, `(rows, fft_size / 2 + 1, frames)`
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidInput` if the signal is too short to be
    /// reflect-padded (`samples <= fft_size / 2`)
    pub fn transform(&self, signal: ArrayView2<f32>) -> Result<Array3<Complex<f32>>> {
        let (rows, n_samples) = signal.dim();
        let fft_size = self.resolution.fft_size;
        let hop = self.resolution.hop_size;
        let pad = fft_size / 2;

        if n_samples <= pad {
            return Err(LossError::InvalidInput(format!(
                "Signal length ({}) must be larger than half the FFT size ({})",
                n_samples, pad
            )));
        }

        let n_freqs = self.resolution.n_freqs();
        let n_frames = self.n_frames(n_samples);
        let mut out = Array3::<Complex<f32>>::zeros((rows, n_freqs, n_frames));

        let mut padded = vec![0.0f32; n_samples + 2 * pad];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];

        for (row, mut row_out) in signal.outer_iter().zip(out.axis_iter_mut(Axis(0))) {
            reflect_pad_into(row.iter().copied(), n_samples, pad, &mut padded);

            for frame in 0..n_frames {
                let start = frame * hop;
                for (k, slot) in buffer.iter_mut().enumerate() {
                    *slot = Complex::new(padded[start + k] * self.window[k], 0.0);
                }
                self.fft.process_with_scratch(&mut buffer, &mut scratch);
                for (bin, value) in buffer.iter().take(n_freqs).enumerate() {
                    row_out[[bin, frame]] = *value;
                }
            }
        }

        Ok(out)
    }

    /// Magnitude spectrum of every row of `signal`
    ///
    /// The magnitude is `sqrt(max(re² + im², eps))`. Floored real and
    /// imaginary parts are built on request through [`Spectrogram::real`]
    /// and [`Spectrogram::imag`].
    pub fn spectrogram(&self, signal: ArrayView2<f32>, eps: f32) -> Result<Spectrogram> {
        let spectrum = self.transform(signal)?;
        let magnitude = spectrum.mapv(|c| (c.re * c.re + c.im * c.im).max(eps).sqrt());

        Ok(Spectrogram {
            magnitude,
            spectrum,
        })
    }
}

/// Write `samples` into `padded` with `pad` reflected samples on each side
///
/// Requires `pad < n_samples`.
fn reflect_pad_into(
    samples: impl Iterator<Item = f32>,
    n_samples: usize,
    pad: usize,
    padded: &mut [f32],
) {
    for (i, x) in samples.enumerate() {
        padded[pad + i] = x;
    }
    for i in 0..pad {
        // left: x[pad - i], right: x[n - 2 - i]
        padded[i] = padded[2 * pad - i];
        padded[pad + n_samples + i] = padded[pad + n_samples - 2 - i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindowKind;
    use ndarray::Array2;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_reflect_pad() {
        let mut padded = vec![0.0f32; 5 + 4];
        reflect_pad_into([1.0, 2.0, 3.0, 4.0, 5.0].into_iter(), 5, 2, &mut padded);
        assert_eq!(padded, vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0]);
    }

    #[test]
    fn test_output_shape() {
        let stft = Stft::new(Resolution::new(512, 128, 256, WindowKind::Hann)).unwrap();
        let signal = Array2::<f32>::zeros((3, 1000));
        let out = stft.transform(signal.view()).unwrap();
        assert_eq!(out.dim(), (3, 257, 1 + 1000 / 128));
    }

    #[test]
    fn test_too_short_signal() {
        let stft = Stft::new(Resolution::new(512, 128, 512, WindowKind::Hann)).unwrap();
        let signal = Array2::<f32>::zeros((1, 256));
        assert!(matches!(stft.transform(signal.view()), Err(LossError::InvalidInput(_))));
        let signal = Array2::<f32>::zeros((1, 257));
        assert!(stft.transform(signal.view()).is_ok());
    }

    #[test]
    fn test_invalid_resolution() {
        let res = Resolution::new(256, 64, 512, WindowKind::Hann);
        assert!(matches!(Stft::new(res), Err(LossError::InvalidConfig(_))));
    }

    #[test]
    fn test_sine_peak_bin() {
        // 1 kHz at 16 kHz with fft 512 -> bin 32
        let stft = Stft::new(Resolution::new(512, 128, 512, WindowKind::Hann)).unwrap();
        let signal = Array2::from_shape_vec((1, 4096), sine(1000.0, 16000.0, 4096)).unwrap();
        let spec = stft.spectrogram(signal.view(), 1e-8).unwrap();

        let frame = spec.magnitude.index_axis(Axis(2), 8);
        let row = frame.index_axis(Axis(0), 0);
        let (peak_bin, _) = row
            .iter()
            .enumerate()
            .fold((0, 0.0f32), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
        assert_eq!(peak_bin, 32);
    }

    #[test]
    fn test_silence_is_floored() {
        let stft = Stft::new(Resolution::new(64, 16, 64, WindowKind::Hamming)).unwrap();
        let signal = Array2::<f32>::zeros((2, 200));
        let spec = stft.spectrogram(signal.view(), 1e-8).unwrap();
        let floor = 1e-8f32.sqrt();
        assert!(spec.magnitude.iter().all(|&v| (v - floor).abs() < 1e-9));
        assert_eq!(spec.complex().dim(), spec.magnitude.dim());
        assert!(spec.real(1e-8).iter().all(|&v| v == 1e-8));
        assert!(spec.imag(1e-8).iter().all(|&v| v == 1e-8));
    }

    #[test]
    fn test_real_imag_are_floored_not_abs() {
        let stft = Stft::new(Resolution::new(64, 16, 64, WindowKind::Hann)).unwrap();
        let signal = Array2::from_shape_vec((1, 256), sine(3000.0, 16000.0, 256)).unwrap();
        let spec = stft.spectrogram(signal.view(), 1e-8).unwrap();
        let (real, imag) = (spec.real(1e-8), spec.imag(1e-8));
        assert!(real.iter().all(|&v| v >= 1e-8));
        assert!(imag.iter().all(|&v| v >= 1e-8));
        // magnitude dominates both clamped parts
        for ((m, r), i) in spec.magnitude.iter().zip(real.iter()).zip(imag.iter()) {
            assert!(*m + 1e-4 >= *r && *m + 1e-4 >= *i);
        }
    }
}
