//! Single resolution STFT loss
//!
//! Compares estimate and target through one STFT configuration:
//!
//! 1. Magnitude (floored at `eps`) of both signals, plus floored real/imag
//!    spectra when their weights are nonzero
//! 2. Optional mel/chroma filterbank on the magnitudes
//! 3. Optional scale-invariant alignment of the target magnitude
//! 4. `loss = w_sc·SC + w_mag·LogMag (+ w_real·LogReal) (+ w_imag·LogImag)`
//! 5. Reduction
//!
//! # Reference
//!
//! Yamamoto, R., Song, E., & Kim, J.-M. (2020). Parallel WaveGAN: A fast waveform
//! generation model based on generative adversarial networks with multi-resolution
//! spectrogram. *ICASSP 2020*.
//!
//! # Example
//!
//! ```
//! use ndarray::Array3;
//! use stratum_loss::{StftLoss, StftLossConfig};
//!
//! let loss = StftLoss::new(StftLossConfig::default())?;
//! let x = Array3::<f32>::from_shape_fn((2, 1, 8000), |(_, _, t)| (t as f32 * 0.05).sin());
//! let value = loss.evaluate(&x, &x)?.loss();
//! assert!(value.abs() < 1e-4);
//! # Ok::<(), stratum_loss::LossError>(())
//! ```

use super::alignment::align_target;
use super::metrics::{log_magnitude_distance, spectral_convergence};
use super::scaling::FrequencyScaler;
use super::{flatten_pair, LossOutput, SpectralTerms};
use crate::config::{FrequencyScale, LossOptions, Resolution, StftLossConfig};
use crate::error::{LossError, Result};
use crate::features::stft::Stft;
use ndarray::{arr0, ArrayBase, ArrayView2, Data, Dimension};

/// Default number of mel bands for the mel preset
pub const DEFAULT_MEL_BINS: usize = 128;

/// Default number of chroma bins for the chroma preset
pub const DEFAULT_CHROMA_BINS: usize = 12;

impl StftLossConfig {
    /// Mel-scaled loss on the default resolution
    ///
    /// Real and imaginary terms are disabled.
    pub fn mel_preset(sample_rate: u32, n_mels: usize) -> Self {
        Self::scaled_preset(FrequencyScale::Mel, sample_rate, n_mels)
    }

    /// Chroma-scaled loss on the default resolution
    ///
    /// Real and imaginary terms are disabled.
    pub fn chroma_preset(sample_rate: u32, n_chroma: usize) -> Self {
        Self::scaled_preset(FrequencyScale::Chroma, sample_rate, n_chroma)
    }

    fn scaled_preset(scale: FrequencyScale, sample_rate: u32, n_bins: usize) -> Self {
        Self {
            resolution: Resolution::default(),
            options: LossOptions {
                w_real: 0.0,
                w_imag: 0.0,
                sample_rate: Some(sample_rate),
                scale,
                n_bins: Some(n_bins),
                ..Default::default()
            },
        }
    }

    /// Replace the resolution, keeping the options
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }
}

/// STFT loss at one resolution
///
/// Immutable after construction; `evaluate` takes `&self` and can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct StftLoss {
    options: LossOptions,
    stft: Stft,
    scaler: Option<FrequencyScaler>,
}

impl StftLoss {
    /// Build a loss from a config
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if:
    /// - the resolution is invalid (`win_length > fft_size`, zero sizes)
    /// - a frequency scale is requested without `sample_rate` or `n_bins`
    /// - `n_bins > fft_size`
    /// - `eps <= 0`
    pub fn new(config: StftLossConfig) -> Result<Self> {
        Self::from_parts(config.resolution, config.options)
    }

    /// Mel-scaled loss (default resolution, `n_mels` bands)
    pub fn mel(sample_rate: u32, n_mels: usize) -> Result<Self> {
        Self::new(StftLossConfig::mel_preset(sample_rate, n_mels))
    }

    /// Chroma-scaled loss (default resolution, `n_chroma` bins)
    pub fn chroma(sample_rate: u32, n_chroma: usize) -> Result<Self> {
        Self::new(StftLossConfig::chroma_preset(sample_rate, n_chroma))
    }

    pub(crate) fn from_parts(resolution: Resolution, options: LossOptions) -> Result<Self> {
        resolution.validate()?;
        options.validate(resolution.fft_size)?;

        let scaler = match (options.scale, options.sample_rate, options.n_bins) {
            (FrequencyScale::None, _, _) => None,
            (scale, Some(sample_rate), Some(n_bins)) => Some(FrequencyScaler::new(
                scale,
                sample_rate,
                resolution.fft_size,
                n_bins,
            )?),
            (scale, _, _) => {
                return Err(LossError::InvalidConfig(format!(
                    "{:?} scale requires sample_rate and n_bins",
                    scale
                )))
            }
        };

        if options.w_phs != 0.0 {
            log::warn!(
                "w_phs={} has no effect: the phase term is not computed",
                options.w_phs
            );
        }

        log::debug!(
            "STFT loss: {}, scale={:?}, scale_invariance={}, reduction={:?}",
            resolution,
            options.scale,
            options.scale_invariance,
            options.reduction
        );

        Ok(Self {
            options,
            stft: Stft::new(resolution)?,
            scaler,
        })
    }

    /// Analysis resolution
    pub fn resolution(&self) -> &Resolution {
        self.stft.resolution()
    }

    /// Weights and flags
    pub fn options(&self) -> &LossOptions {
        &self.options
    }

    /// Frequency scaler, if a mel or chroma scale is configured
    pub fn scaler(&self) -> Option<&FrequencyScaler> {
        self.scaler.as_ref()
    }

    /// Evaluate the loss
    ///
    /// # Arguments
    ///
    /// * `input` - Estimate, any shape; the last axis is time
    /// * `target` - Target, same shape as `input`
    ///
    /// # Returns
    ///
    /// `Loss(total)` or `Full(total, SpectralTerms)` depending on `output`
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidInput` if shapes differ or the signals are
    /// not longer than `fft_size / 2`
    pub fn evaluate<S, D>(
        &self,
        input: &ArrayBase<S, D>,
        target: &ArrayBase<S, D>,
    ) -> Result<LossOutput<SpectralTerms>>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let (x, y) = flatten_pair(input, target)?;
        let (loss, terms) = self.compute(x.view(), y.view())?;
        Ok(LossOutput::new(self.options.output, loss, terms))
    }

    /// Reduced loss and unweighted terms for `(rows, samples)` signals
    pub(crate) fn compute(
        &self,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<(f32, SpectralTerms)> {
        let eps = self.options.eps;
        let x_spec = self.stft.spectrogram(x, eps)?;
        let y_spec = self.stft.spectrogram(y, eps)?;

        // Floored parts are only materialized for terms that contribute
        let real_loss = (self.options.w_real > 0.0)
            .then(|| log_magnitude_distance(x_spec.real(eps).view(), y_spec.real(eps).view()));
        let imag_loss = (self.options.w_imag > 0.0)
            .then(|| log_magnitude_distance(x_spec.imag(eps).view(), y_spec.imag(eps).view()));

        let (x_mag, mut y_mag) = match &self.scaler {
            Some(scaler) => (
                scaler.apply(x_spec.magnitude.view())?,
                scaler.apply(y_spec.magnitude.view())?,
            ),
            None => (x_spec.magnitude, y_spec.magnitude),
        };

        // Alignment sees the scaled spectra
        if self.options.scale_invariance {
            align_target(x_mag.view(), &mut y_mag);
        }

        let sc_loss = spectral_convergence(x_mag.view(), y_mag.view());
        let mag_loss = log_magnitude_distance(x_mag.view(), y_mag.view());
        let mut loss = self.options.w_sc * sc_loss + self.options.w_mag * mag_loss;

        if let Some(real_loss) = real_loss {
            loss += self.options.w_real * real_loss;
        }
        if let Some(imag_loss) = imag_loss {
            loss += self.options.w_imag * imag_loss;
        }

        // The weighted loss is 0-d, so every reduction leaves a single value
        let loss = self
            .options
            .reduction
            .reduce(arr0(loss))
            .iter()
            .copied()
            .next()
            .unwrap_or(f32::NAN);

        log::debug!(
            "STFT loss ({}): rows={}, sc={:.6}, mag={:.6}, total={:.6}",
            self.stft.resolution(),
            x.nrows(),
            sc_loss,
            mag_loss,
            loss
        );

        Ok((loss, SpectralTerms { sc_loss, mag_loss }))
    }
}
