//! # Stratum Loss
//!
//! Frequency-domain loss functions for comparing audio signals, intended for
//! training and evaluating audio models.
//!
//! ## Features
//!
//! - **STFT Loss**: Spectral convergence plus log-magnitude distance at one resolution
//! - **Multi-Resolution**: Average over a fixed list of FFT / hop / window sizes
//! - **Random-Resolution**: Ensemble resampled from a seeded RNG every N evaluations
//! - **Stereo**: Sum and difference decomposition over a multi-resolution loss
//! - **Perceptual Scaling**: Optional mel or chroma filterbank before comparison
//!
//! ## Quick Start
//!
//! ```
//! use ndarray::Array2;
//! use stratum_loss::{MultiResolutionConfig, MultiResolutionStftLoss};
//!
//! // (batch, samples) at 16 kHz
//! let target = Array2::<f32>::from_shape_fn((1, 16000), |(_, t)| {
//!     (2.0 * std::f32::consts::PI * 440.0 * t as f32 / 16000.0).sin()
//! });
//! let estimate = target.mapv(|v| 0.5 * v);
//!
//! let loss = MultiResolutionStftLoss::new(MultiResolutionConfig::default())?;
//! let value = loss.evaluate(&estimate, &target)?.loss();
//! assert!(value > 0.0);
//! # Ok::<(), stratum_loss::LossError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal → Window / STFT → Magnitude → (Mel | Chroma)
//!        → (Alignment) → Metrics → Reduction
//! ```
//!
//! Inputs of any rank are accepted; every axis but the last is flattened into
//! independent rows before the transform.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod features;
pub mod loss;
pub mod preprocessing;

// Re-export main types
pub use config::{
    FrequencyScale, LossOptions, MultiResolutionConfig, OutputMode, RandomResolutionConfig,
    Reduction, Resolution, StftLossConfig, SumAndDifferenceConfig, WindowKind,
};
pub use error::{LossError, Result};
pub use loss::multi_resolution::MultiResolutionStftLoss;
pub use loss::random_resolution::{RandomResolutionStftLoss, RandomSource};
pub use loss::stft_loss::StftLoss;
pub use loss::sum_difference::SumAndDifferenceStftLoss;
pub use loss::{LossOutput, SpectralTerms, StereoTerms};
