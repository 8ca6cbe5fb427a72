//! Multi-resolution STFT loss
//!
//! Averages single resolution losses over a fixed list of analysis grids,
//! so no single window size dominates the training signal.
//!
//! # Reference
//!
//! Yamamoto, R., Song, E., & Kim, J.-M. (2020). Parallel WaveGAN. *ICASSP 2020*.
//!
//! # Example
//!
//! ```
//! use ndarray::Array2;
//! use stratum_loss::{MultiResolutionConfig, MultiResolutionStftLoss};
//!
//! let loss = MultiResolutionStftLoss::new(MultiResolutionConfig::default())?;
//! assert_eq!(loss.losses().len(), 3);
//!
//! let x = Array2::<f32>::from_shape_fn((1, 4096), |(_, t)| (t as f32 * 0.01).sin());
//! assert!(loss.evaluate(&x, &x)?.loss() < 1e-4);
//! # Ok::<(), stratum_loss::LossError>(())
//! ```

use super::stft_loss::StftLoss;
use super::{flatten_pair, mean_terms, LossOutput, SpectralTerms};
use crate::config::{LossOptions, MultiResolutionConfig, OutputMode};
use crate::error::Result;
use ndarray::{ArrayBase, ArrayView2, Data, Dimension};

/// Average of STFT losses over a fixed set of resolutions
#[derive(Debug, Clone)]
pub struct MultiResolutionStftLoss {
    losses: Vec<StftLoss>,
    output: OutputMode,
}

impl MultiResolutionStftLoss {
    /// Build one STFT loss per `(fft_size, hop_size, win_length)` triple
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if the three lists differ in length,
    /// are empty, or any resolution is invalid for the shared options
    pub fn new(config: MultiResolutionConfig) -> Result<Self> {
        let resolutions = config.resolutions()?;
        let output = config.options.output;
        let member_options = LossOptions {
            output: OutputMode::Loss,
            ..config.options
        };

        let losses = resolutions
            .into_iter()
            .map(|resolution| StftLoss::from_parts(resolution, member_options.clone()))
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Multi-resolution STFT loss: {} resolutions", losses.len());

        Ok(Self { losses, output })
    }

    /// Member losses, one per resolution
    pub fn losses(&self) -> &[StftLoss] {
        &self.losses
    }

    /// Evaluate every member on the same pair and average
    ///
    /// In `Full` mode the reported terms are the member-averaged
    /// spectral convergence and log magnitude.
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidInput` if shapes differ or the signals are
    /// not longer than half the largest FFT size
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
        let (loss, terms) = average_losses(&self.losses, x.view(), y.view())?;
        Ok(LossOutput::new(self.output, loss, terms))
    }

    pub(crate) fn compute(
        &self,
        x: ArrayView2<f32>,
        y: ArrayView2<f32>,
    ) -> Result<(f32, SpectralTerms)> {
        average_losses(&self.losses, x, y)
    }
}

/// Mean loss and terms of `losses` on one `(rows, samples)` pair
pub(crate) fn average_losses(
    losses: &[StftLoss],
    x: ArrayView2<f32>,
    y: ArrayView2<f32>,
) -> Result<(f32, SpectralTerms)> {
    let results = losses
        .iter()
        .map(|loss| loss.compute(x, y))
        .collect::<Result<Vec<_>>>()?;
    Ok(mean_terms(&results))
}
