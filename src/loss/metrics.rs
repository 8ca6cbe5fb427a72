//! Spectral distance metrics
//!
//! # Reference
//!
//! Arık, S. Ö., Jun, H., & Diamos, G. (2018). Fast Spectrogram Inversion Using
//! Multi-Head Convolutional Neural Networks. *IEEE Signal Processing Letters*, 26(1), 94-98.

use ndarray::{ArrayView, Dimension, Zip};

/// Spectral convergence: `||y - x||_F / ||y||_F`
///
/// The Frobenius norms run over the whole tensor (all batch, frequency and
/// time elements jointly). An all-zero `y` gives an infinite or NaN result;
/// callers floor magnitudes at `eps` so the denominator is never exactly zero.
///
/// # Arguments
///
/// * `x_mag` - Estimate magnitude spectrum
/// * `y_mag` - Target magnitude spectrum, same shape as `x_mag`
///
/// # Panics
///
/// Panics if `x_mag` and `y_mag` differ in shape. The losses check shapes
/// before calling.
pub fn spectral_convergence<D: Dimension>(
    x_mag: ArrayView<f32, D>,
    y_mag: ArrayView<f32, D>,
) -> f32 {
    let (diff_sq, target_sq) = Zip::from(&x_mag)
        .and(&y_mag)
        .fold((0.0f64, 0.0f64), |(diff_sq, target_sq), &x, &y| {
            let d = (y - x) as f64;
            (diff_sq + d * d, target_sq + (y as f64) * (y as f64))
        });

    (diff_sq.sqrt() / target_sq.sqrt()) as f32
}

/// Log-magnitude distance: `mean(|ln x - ln y|)`
///
/// Both inputs must be strictly positive. Used for the magnitude spectrum
/// and for the floored real and imaginary parts alike.
///
/// # Panics
///
/// Panics if `x` and `y` differ in shape.
pub fn log_magnitude_distance<D: Dimension>(x: ArrayView<f32, D>, y: ArrayView<f32, D>) -> f32 {
    let n = x.len();
    if n == 0 {
        return f32::NAN;
    }

    let total = Zip::from(&x)
        .and(&y)
        .fold(0.0f64, |acc, &a, &b| acc + ((a as f64).ln() - (b as f64).ln()).abs());

    (total / n as f64) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array3};
    use proptest::prelude::*;

    #[test]
    #[should_panic]
    fn test_spectral_convergence_shape_mismatch_panics() {
        let x = Array3::<f32>::ones((1, 5, 7));
        let y = Array3::<f32>::ones((1, 5, 8));
        spectral_convergence(x.view(), y.view());
    }

    #[test]
    #[should_panic]
    fn test_log_magnitude_shape_mismatch_panics() {
        let x = Array3::<f32>::ones((2, 5, 7));
        let y = Array3::<f32>::ones((1, 5, 7));
        log_magnitude_distance(x.view(), y.view());
    }

    #[test]
    fn test_spectral_convergence_identical_is_zero() {
        let x = Array3::<f32>::from_elem((2, 5, 7), 0.3);
        assert_eq!(spectral_convergence(x.view(), x.view()), 0.0);
    }

    #[test]
    fn test_spectral_convergence_known_value() {
        let x = array![[0.0f32, 0.0], [0.0, 0.0]];
        let y = array![[3.0f32, 0.0], [0.0, 4.0]];
        // ||y - 0|| / ||y|| = 1
        assert_relative_eq!(spectral_convergence(x.view(), y.view()), 1.0);

        let x = array![[3.0f32, 0.0], [0.0, 0.0]];
        // ||(0, 4)|| / ||(3, 4)|| = 4 / 5
        assert_relative_eq!(spectral_convergence(x.view(), y.view()), 0.8, epsilon = 1e-6);
    }

    #[test]
    fn test_spectral_convergence_is_joint_over_batch() {
        // Per-batch averaging would give (1 + 0) / 2 = 0.5; the joint norm does not
        let x = Array3::from_shape_vec((2, 1, 1), vec![0.0f32, 1.0]).unwrap();
        let y = Array3::from_shape_vec((2, 1, 1), vec![1.0f32, 1.0]).unwrap();
        assert_relative_eq!(
            spectral_convergence(x.view(), y.view()),
            1.0 / 2.0f32.sqrt(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_log_magnitude_known_value() {
        let e = std::f32::consts::E;
        let x = array![1.0f32, 1.0];
        let y = array![e, 1.0];
        assert_relative_eq!(log_magnitude_distance(x.view(), y.view()), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_log_magnitude_gain_offset() {
        // A constant gain k gives |ln k| everywhere
        let x = Array3::<f32>::from_shape_fn((2, 4, 3), |(a, b, c)| 0.1 + (a + b + c) as f32);
        let y = x.mapv(|v| v * 2.0);
        assert_relative_eq!(
            log_magnitude_distance(x.view(), y.view()),
            2.0f32.ln(),
            epsilon = 1e-5
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn property_log_magnitude_symmetric(
            pairs in proptest::collection::vec((1e-6f32..10.0, 1e-6f32..10.0), 1..64)
        ) {
            let x = ndarray::Array1::from(pairs.iter().map(|p| p.0).collect::<Vec<_>>());
            let y = ndarray::Array1::from(pairs.iter().map(|p| p.1).collect::<Vec<_>>());
            let forward = log_magnitude_distance(x.view(), y.view());
            let backward = log_magnitude_distance(y.view(), x.view());
            prop_assert!((forward - backward).abs() <= 1e-6 * (1.0 + forward.abs()));
            prop_assert!(forward >= 0.0);
        }

        #[test]
        fn property_spectral_convergence_zero_only_for_equal(
            values in proptest::collection::vec(1e-3f32..10.0, 1..64),
            idx in 0usize..64,
        ) {
            let y = ndarray::Array1::from(values.clone());
            prop_assert_eq!(spectral_convergence(y.view(), y.view()), 0.0);

            let mut perturbed = values;
            let i = idx % perturbed.len();
            perturbed[i] += 0.5;
            let x = ndarray::Array1::from(perturbed);
            prop_assert!(spectral_convergence(x.view(), y.view()) > 0.0);
        }
    }
}
