//! Chroma filterbank construction
//!
//! Maps STFT bins onto pitch classes with Gaussian bumps in log-frequency
//! space, one per chroma bin, followed by per-bin L2 normalization and an
//! octave-dominance weighting that favours the middle of the spectrum.
//! Row 0 of the result is C.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Chroma feature analysis and synthesis.
//! LabROSA, Columbia University.

use crate::error::{LossError, Result};
use ndarray::Array2;

/// Reference tuning (A4) in Hz
const A440: f64 = 440.0;

/// Centre of the octave-dominance weighting, in octaves above A0/16
const CENTER_OCTAVE: f64 = 5.0;

/// Width (standard deviation) of the octave-dominance weighting, in octaves
const OCTAVE_WIDTH: f64 = 2.0;

/// Build a chroma filterbank
///
/// # Arguments
///
/// * `sample_rate` - Sample rate in Hz
/// * `fft_size` - FFT size the filterbank will be applied to
/// * `n_chroma` - Number of chroma bins (12 for semitones)
///
/// # Returns
///
/// Filterbank matrix, `(n_chroma, fft_size / 2 + 1)`
///
/// # Errors
///
/// Returns `LossError::InvalidConfig` if any argument is zero or `fft_size < 2`
pub fn chroma_filterbank(
    sample_rate: u32,
    fft_size: usize,
    n_chroma: usize,
) -> Result<Array2<f32>> {
    if sample_rate == 0 || fft_size < 2 || n_chroma == 0 {
        return Err(LossError::InvalidConfig(format!(
            "Invalid chroma filterbank parameters: sample_rate={}, fft_size={}, n_chroma={}",
            sample_rate, fft_size, n_chroma
        )));
    }

    let nc = n_chroma as f64;
    let sr = sample_rate as f64;

    // Fractional chroma bin of every FFT bin; DC gets a placeholder 1.5 octaves below bin 1
    let mut frq_bins = Vec::with_capacity(fft_size);
    for k in 1..fft_size {
        let freq = k as f64 * sr / fft_size as f64;
        frq_bins.push(nc * (freq / (A440 / 16.0)).log2());
    }
    frq_bins.insert(0, frq_bins[0] - 1.5 * nc);

    let mut bin_widths: Vec<f64> = frq_bins
        .windows(2)
        .map(|w| (w[1] - w[0]).max(1.0))
        .collect();
    bin_widths.push(1.0);

    let half = round_half_even(nc / 2.0);
    let mut weights = Array2::<f64>::zeros((n_chroma, fft_size));
    for c in 0..n_chroma {
        for (k, (&fb, &width)) in frq_bins.iter().zip(&bin_widths).enumerate() {
            // distance to chroma c, wrapped into [-n/2, n/2)
            let d = (fb - c as f64 + half + 10.0 * nc).rem_euclid(nc) - half;
            weights[[c, k]] = (-0.5 * (2.0 * d / width).powi(2)).exp();
        }
    }

    for k in 0..fft_size {
        let norm = weights.column(k).iter().map(|w| w * w).sum::<f64>().sqrt();
        if norm > f64::MIN_POSITIVE {
            weights.column_mut(k).mapv_inplace(|w| w / norm);
        }
        let octave = frq_bins[k] / nc;
        let dominance = (-0.5 * ((octave - CENTER_OCTAVE) / OCTAVE_WIDTH).powi(2)).exp();
        weights.column_mut(k).mapv_inplace(|w| w * dominance);
    }

    // Rotate so that row 0 is C rather than A
    let shift = 3 * (n_chroma / 12);
    let n_freqs = fft_size / 2 + 1;
    let out = Array2::from_shape_fn((n_chroma, n_freqs), |(c, k)| {
        weights[[(c + shift) % n_chroma, k]] as f32
    });

    if out.iter().any(|w| !w.is_finite()) {
        return Err(LossError::NumericalError(format!(
            "Chroma filterbank has non-finite weights (sample_rate={}, fft_size={}, n_chroma={})",
            sample_rate, fft_size, n_chroma
        )));
    }

    log::debug!(
        "Built chroma filterbank: {} chroma × {} bins at {} Hz",
        n_chroma,
        n_freqs,
        sample_rate
    );

    Ok(out)
}

/// Round to nearest, ties to even
fn round_half_even(x: f64) -> f64 {
    let r = x.round();
    if (x - x.trunc()).abs() == 0.5 && r % 2.0 != 0.0 {
        r - x.signum()
    } else {
        r
    }
}
