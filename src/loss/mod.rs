//! Spectral loss modules
//!
//! Building blocks, leaves first:
//! - Reduction (`none` / `mean` / `sum`)
//! - Spectral convergence and log-magnitude metrics
//! - Frequency scaling (mel / chroma filterbanks)
//! - Scale-invariant target alignment
//! - Single, multi and random resolution STFT losses
//! - Sum and difference (stereo) wrapper

pub mod alignment;
pub mod metrics;
pub mod multi_resolution;
pub mod random_resolution;
pub mod reduction;
pub mod scaling;
pub mod stft_loss;
pub mod sum_difference;

use crate::config::OutputMode;
use crate::error::{LossError, Result};
use ndarray::{ArrayBase, CowArray, Data, Dimension, Ix2};
use serde::Serialize;

/// Value returned by a loss evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LossOutput<T> {
    /// Aggregate loss only (`OutputMode::Loss`)
    Loss(f32),
    /// Aggregate loss plus intermediate terms (`OutputMode::Full`)
    Full(f32, T),
}

impl<T> LossOutput<T> {
    pub(crate) fn new(mode: OutputMode, loss: f32, terms: T) -> Self {
        match mode {
            OutputMode::Loss => LossOutput::Loss(loss),
            OutputMode::Full => LossOutput::Full(loss, terms),
        }
    }

    /// Aggregate loss
    pub fn loss(&self) -> f32 {
        match self {
            LossOutput::Loss(loss) | LossOutput::Full(loss, _) => *loss,
        }
    }

    /// Intermediate terms, present only in `Full` mode
    pub fn terms(&self) -> Option<&T> {
        match self {
            LossOutput::Loss(_) => None,
            LossOutput::Full(_, terms) => Some(terms),
        }
    }
}

/// Intermediate terms of a spectral loss
///
/// Diagnostic only. The real/imag terms are folded into the aggregate loss
/// but not reported; no phase term is ever computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpectralTerms {
    /// Spectral convergence (unweighted)
    pub sc_loss: f32,
    /// Log magnitude distance (unweighted)
    pub mag_loss: f32,
}

/// Intermediate terms of the sum and difference loss
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StereoTerms {
    /// Loss on the sum (mid) channel
    pub sum_loss: f32,
    /// Loss on the difference (side) channel
    pub diff_loss: f32,
}

/// Flatten estimate and target to `(rows, samples)` along the last axis
pub(crate) fn flatten_pair<'a, S, D>(
    input: &'a ArrayBase<S, D>,
    target: &'a ArrayBase<S, D>,
) -> Result<(CowArray<'a, f32, Ix2>, CowArray<'a, f32, Ix2>)>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    if input.shape() != target.shape() {
        return Err(LossError::InvalidInput(format!(
            "Input shape {:?} does not match target shape {:?}",
            input.shape(),
            target.shape()
        )));
    }

    Ok((flatten_rows(input)?, flatten_rows(target)?))
}

fn flatten_rows<S, D>(signal: &ArrayBase<S, D>) -> Result<CowArray<'_, f32, Ix2>>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    let n_samples = match signal.shape().last() {
        Some(&n) if n > 0 => n,
        _ => {
            return Err(LossError::InvalidInput(format!(
                "Signal must have a non-empty time axis, got shape {:?}",
                signal.shape()
            )))
        }
    };
    let rows = signal.len() / n_samples;

    signal
        .to_shape((rows, n_samples))
        .map_err(|e| LossError::InvalidInput(format!("Cannot flatten signal: {}", e)))
}

/// Mean of `(loss, terms)` over evaluations
pub(crate) fn mean_terms(results: &[(f32, SpectralTerms)]) -> (f32, SpectralTerms) {
    let n = results.len() as f32;
    let (loss, sc, mag) = results
        .iter()
        .fold((0.0f32, 0.0f32, 0.0f32), |(l, s, m), (loss, terms)| {
            (l + loss, s + terms.sc_loss, m + terms.mag_loss)
        });

    (
        loss / n,
        SpectralTerms {
            sc_loss: sc / n,
            mag_loss: mag / n,
        },
    )
}
