//! Loss reduction (`none` / `mean` / `sum`)

use crate::config::Reduction;
use ndarray::{arr0, Array, ArrayD, Dimension};

impl Reduction {
    /// Reduce a loss tensor
    ///
    /// `None` returns the tensor unchanged (shape preserved). `Mean` and `Sum`
    /// return a 0-d tensor. The mean of an empty tensor is NaN.
    ///
    /// # Example
    ///
    /// ```
    /// use ndarray::array;
    /// use stratum_loss::config::Reduction;
    ///
    /// let t = array![[1.0f32, 2.0], [3.0, 6.0]];
    /// assert_eq!(Reduction::Sum.reduce(t.clone()).sum(), 12.0);
    /// assert_eq!(Reduction::Mean.reduce(t.clone()).sum(), 3.0);
    /// assert_eq!(Reduction::None.reduce(t).shape(), &[2, 2]);
    /// ```
    pub fn reduce<D: Dimension>(&self, losses: Array<f32, D>) -> ArrayD<f32> {
        match self {
            Reduction::None => losses.into_dyn(),
            Reduction::Mean => arr0(losses.mean().unwrap_or(f32::NAN)).into_dyn(),
            Reduction::Sum => arr0(losses.sum()).into_dyn(),
        }
    }
}
