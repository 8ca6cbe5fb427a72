//! Channel mixing utilities (stereo sum/difference decomposition)

use crate::error::{LossError, Result};
use ndarray::{Array2, ArrayBase, Axis, Data, Ix3};

/// Split stereo signals into sum (mid) and difference (side) channels
///
/// # Arguments
///
/// * `signal` - Stereo signal, `(batch, 2, samples)`
///
/// # Returns
///
/// `(left + right, left - right)`, each `(batch, samples)`
///
/// # Errors
///
/// Returns `LossError::InvalidInput` if the channel axis is not exactly 2
///
/// # Example
///
/// ```
/// use ndarray::array;
/// use stratum_loss::preprocessing::channel_mixer::sum_and_difference;
///
/// let stereo = array![[[1.0f32, 2.0], [0.5, -1.0]]];
/// let (sum, diff) = sum_and_difference(&stereo)?;
/// assert_eq!(sum, array![[1.5f32, 1.0]]);
/// assert_eq!(diff, array![[0.5f32, 3.0]]);
/// # Ok::<(), stratum_loss::LossError>(())
/// ```
pub fn sum_and_difference<S>(signal: &ArrayBase<S, Ix3>) -> Result<(Array2<f32>, Array2<f32>)>
where
    S: Data<Elem = f32>,
{
    let channels = signal.len_of(Axis(1));
    if channels != 2 {
        return Err(LossError::InvalidInput(format!(
            "Sum and difference needs exactly 2 channels, got {} (shape {:?})",
            channels,
            signal.shape()
        )));
    }

    let left = signal.index_axis(Axis(1), 0);
    let right = signal.index_axis(Axis(1), 1);
    log::debug!("Sum/difference split: {} × {} samples", left.nrows(), left.ncols());

    Ok((&left + &right, &left - &right))
}
