//! Mel filterbank construction
//!
//! Triangular filters equally spaced on the Slaney mel scale between 0 Hz
//! and Nyquist, each scaled to unit area (Slaney normalization).
//!
//! # Reference
//!
//! Slaney, M. (1998). Auditory Toolbox, Version 2. Interval Research Corporation,
//! Technical Report #1998-010.

use crate::error::{LossError, Result};
use ndarray::Array2;

/// Linear region slope of the Slaney scale (Hz per mel)
const F_SP: f64 = 200.0 / 3.0;

/// Start of the logarithmic region in Hz
const MIN_LOG_HZ: f64 = 1000.0;

/// Start of the logarithmic region in mels
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

/// Convert Hz to Slaney mels (linear below 1 kHz, logarithmic above)
pub fn hz_to_mel(hz: f64) -> f64 {
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels back to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (logstep * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Build a mel filterbank
///
/// # Arguments
///
/// * `sample_rate` - Sample rate in Hz
/// * `fft_size` - FFT size the filterbank will be applied to
/// * `n_mels` - Number of mel bands
///
/// # Returns
///
/// Filterbank matrix, `(n_mels, fft_size / 2 + 1)`
///
/// # Errors
///
/// Returns `LossError::InvalidConfig` if any argument is zero
pub fn mel_filterbank(sample_rate: u32, fft_size: usize, n_mels: usize) -> Result<Array2<f32>> {
    if sample_rate == 0 || fft_size == 0 || n_mels == 0 {
        return Err(LossError::InvalidConfig(format!(
            "Invalid mel filterbank parameters: sample_rate={}, fft_size={}, n_mels={}",
            sample_rate, fft_size, n_mels
        )));
    }

    let n_freqs = fft_size / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;

    let fft_freqs: Vec<f64> = (0..n_freqs)
        .map(|j| {
            if n_freqs > 1 {
                nyquist * j as f64 / (n_freqs - 1) as f64
            } else {
                0.0
            }
        })
        .collect();

    // n_mels + 2 band edges, equally spaced in mels
    let mel_max = hz_to_mel(nyquist);
    let mel_edges: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(mel_max * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f32>::zeros((n_mels, n_freqs));
    for m in 0..n_mels {
        let (lo, center, hi) = (mel_edges[m], mel_edges[m + 1], mel_edges[m + 2]);
        let enorm = 2.0 / (hi - lo);
        for (j, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - lo) / (center - lo);
            let upper = (hi - f) / (hi - center);
            let w = lower.min(upper).max(0.0) * enorm;
            weights[[m, j]] = w as f32;
        }
    }

    if weights.iter().any(|w| !w.is_finite()) {
        return Err(LossError::NumericalError(format!(
            "Mel filterbank has non-finite weights (sample_rate={}, fft_size={}, n_mels={})",
            sample_rate, fft_size, n_mels
        )));
    }

    let empty = empty_bands(&weights);
    if empty > 0 {
        log::warn!(
            "Mel filterbank has {} empty bands (sample_rate={}, fft_size={}, n_mels={}); \
             reduce n_mels or increase fft_size",
            empty,
            sample_rate,
            fft_size,
            n_mels
        );
    }

    log::debug!(
        "Built mel filterbank: {} mels × {} bins at {} Hz",
        n_mels,
        n_freqs,
        sample_rate
    );

    Ok(weights)
}

/// Number of bands with no nonzero weight
pub(crate) fn empty_bands(weights: &Array2<f32>) -> usize {
    weights
        .rows()
        .into_iter()
        .filter(|band| band.iter().all(|&w| w == 0.0))
        .count()
}
