//! Frequency axis rescaling with a fixed filterbank

use crate::config::FrequencyScale;
use crate::error::{LossError, Result};
use crate::features::{chroma::chroma_filterbank, mel::mel_filterbank};
use ndarray::linalg::general_mat_mul;
use ndarray::{Array2, Array3, ArrayView3};

/// Mel or chroma filterbank applied along the frequency axis
///
/// Built once per resolution and reused for every evaluation.
#[derive(Debug, Clone)]
pub struct FrequencyScaler {
    scale: FrequencyScale,
    filterbank: Array2<f32>,
}

impl FrequencyScaler {
    /// Build the filterbank for `scale`
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if `scale` is `None`, `n_bins` is zero
    /// or exceeds `fft_size`, or the filterbank cannot be built
    pub fn new(
        scale: FrequencyScale,
        sample_rate: u32,
        fft_size: usize,
        n_bins: usize,
    ) -> Result<Self> {
        if n_bins == 0 || n_bins > fft_size {
            return Err(LossError::InvalidConfig(format!(
                "n_bins ({}) must be in 1..={} (fft_size)",
                n_bins, fft_size
            )));
        }

        let filterbank = match scale {
            FrequencyScale::Mel => mel_filterbank(sample_rate, fft_size, n_bins)?,
            FrequencyScale::Chroma => chroma_filterbank(sample_rate, fft_size, n_bins)?,
            FrequencyScale::None => {
                return Err(LossError::InvalidConfig(
                    "A frequency scaler needs a mel or chroma scale".to_string(),
                ))
            }
        };

        Ok(Self { scale, filterbank })
    }

    /// Wrap an existing `(n_bins, fft_size / 2 + 1)` filterbank
    pub fn from_filterbank(scale: FrequencyScale, filterbank: Array2<f32>) -> Self {
        Self { scale, filterbank }
    }

    /// Scale this filterbank implements
    pub fn scale(&self) -> FrequencyScale {
        self.scale
    }

    /// Filterbank matrix, `(n_bins, n_freqs)`
    pub fn filterbank(&self) -> &Array2<f32> {
        &self.filterbank
    }

    /// `filterbank · spectrum` for every batch element
    ///
    /// # Arguments
    ///
    /// * `spectrum` - `(batch, n_freqs, frames)`
    ///
    /// # Returns
    ///
    /// `(batch, n_bins, frames)`
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidInput` if the frequency axis does not match the filterbank
    pub fn apply(&self, spectrum: ArrayView3<f32>) -> Result<Array3<f32>> {
        let (batch, n_freqs, frames) = spectrum.dim();
        let (n_bins, fb_freqs) = self.filterbank.dim();
        if n_freqs != fb_freqs {
            return Err(LossError::InvalidInput(format!(
                "Spectrum has {} frequency bins, filterbank expects {}",
                n_freqs, fb_freqs
            )));
        }

        let mut out = Array3::<f32>::zeros((batch, n_bins, frames));
        for (src, mut dst) in spectrum.outer_iter().zip(out.outer_iter_mut()) {
            general_mat_mul(1.0, &self.filterbank, &src, 0.0, &mut dst);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_apply_matches_manual_product() {
        let fb = array![[1.0f32, 0.0, 0.0], [0.5, 0.5, 0.0], [0.0, 0.0, 2.0]];
        let scaler = FrequencyScaler::from_filterbank(FrequencyScale::Mel, fb);
        let spec =
            Array3::from_shape_vec((1, 3, 2), vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let out = scaler.apply(spec.view()).unwrap();
        assert_eq!(out.dim(), (1, 3, 2));
        assert_eq!(out[[0, 0, 0]], 1.0);
        assert_eq!(out[[0, 1, 1]], 3.0);
        assert_eq!(out[[0, 2, 0]], 10.0);
    }

    #[test]
    fn test_mel_scaler_shape() {
        let scaler = FrequencyScaler::new(FrequencyScale::Mel, 16000, 512, 40).unwrap();
        assert_eq!(scaler.filterbank().dim(), (40, 257));
        let spec = Array3::<f32>::ones((3, 257, 9));
        assert_eq!(scaler.apply(spec.view()).unwrap().dim(), (3, 40, 9));
    }

    #[test]
    fn test_chroma_scaler_shape() {
        let scaler = FrequencyScaler::new(FrequencyScale::Chroma, 22050, 1024, 12).unwrap();
        assert_eq!(scaler.filterbank().dim(), (12, 513));
    }

    #[test]
    fn test_rejects_bad_bins() {
        assert!(FrequencyScaler::new(FrequencyScale::Mel, 16000, 64, 128).is_err());
        assert!(FrequencyScaler::new(FrequencyScale::None, 16000, 512, 12).is_err());
    }

    #[test]
    fn test_frequency_axis_mismatch() {
        let scaler = FrequencyScaler::new(FrequencyScale::Mel, 16000, 512, 40).unwrap();
        let spec = Array3::<f32>::ones((1, 100, 4));
        assert!(matches!(scaler.apply(spec.view()), Err(LossError::InvalidInput(_))));
    }
}
