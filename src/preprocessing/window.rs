//! Analysis window functions
//!
//! All windows are periodic (the `N + 1` symmetric window with the last
//! sample dropped), which is the form used for STFT analysis.

use crate::config::WindowKind;
use std::f32::consts::PI;

/// Kaiser shape parameter
pub const KAISER_BETA: f32 = 12.0;

/// Generate a periodic window of `length` samples
///
/// # Example
///
/// ```
/// use stratum_loss::config::WindowKind;
/// use stratum_loss::preprocessing::window::generate_window;
///
/// let w = generate_window(WindowKind::Hann, 4);
/// assert_eq!(w, vec![0.0, 0.5, 1.0, 0.5]);
/// ```
pub fn generate_window(kind: WindowKind, length: usize) -> Vec<f32> {
    if length == 0 {
        return Vec::new();
    }
    if length == 1 {
        return vec![1.0];
    }

    let n = length as f32;
    match kind {
        WindowKind::Hann => (0..length)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n).cos())
            .collect(),
        WindowKind::Hamming => (0..length)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / n).cos())
            .collect(),
        WindowKind::Blackman => (0..length)
            .map(|i| {
                let x = 2.0 * PI * i as f32 / n;
                0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
            })
            .collect(),
        WindowKind::Bartlett => (0..length)
            .map(|i| 1.0 - (2.0 * i as f32 / n - 1.0).abs())
            .collect(),
        WindowKind::Kaiser => kaiser(length, KAISER_BETA),
    }
}

/// Periodic Kaiser window
fn kaiser(length: usize, beta: f32) -> Vec<f32> {
    // Symmetric window over length + 1 points, last point dropped
    let half = length as f64 / 2.0;
    let beta = beta as f64;
    let i0_beta = bessel_i0(beta);

    (0..length)
        .map(|i| {
            let x = (i as f64 - half) / half;
            let arg = beta * (1.0 - x * x).max(0.0).sqrt();
            (bessel_i0(arg) / i0_beta) as f32
        })
        .collect()
}

/// Modified Bessel function of the first kind, order 0.
///
/// Polynomial approximation from Abramowitz & Stegun (9.8.1, 9.8.2).
fn bessel_i0(x: f64) -> f64 {
    let ax = x.abs();
    if ax < 3.75 {
        let t = (x / 3.75).powi(2);
        1.0 + t
            * (3.5156229
                + t * (3.0899424
                    + t * (1.2067492 + t * (0.2659732 + t * (0.0360768 + t * 0.0045813)))))
    } else {
        let t = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + t * (0.01328592
                    + t * (0.00225319
                        + t * (-0.00157565
                            + t * (0.00916281
                                + t * (-0.02057706
                                    + t * (0.02635537 + t * (-0.01647633 + t * 0.00392377))))))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WindowKind; 5] = [
        WindowKind::Hann,
        WindowKind::Bartlett,
        WindowKind::Blackman,
        WindowKind::Hamming,
        WindowKind::Kaiser,
    ];

    #[test]
    fn test_window_lengths() {
        for kind in ALL {
            assert_eq!(generate_window(kind, 0).len(), 0);
            assert_eq!(generate_window(kind, 1), vec![1.0]);
            assert_eq!(generate_window(kind, 600).len(), 600);
        }
    }

    #[test]
    fn test_periodic_windows_peak_at_center() {
        for kind in ALL {
            let w = generate_window(kind, 64);
            assert!((w[32] - 1.0).abs() < 1e-4, "{:?} center = {}", kind, w[32]);
            assert!(w.iter().all(|&v| v >= -1e-6 && v <= 1.0 + 1e-6));
        }
    }

    #[test]
    fn test_periodic_symmetry() {
        // w[i] == w[N - i] for periodic windows
        for kind in ALL {
            let w = generate_window(kind, 32);
            for i in 1..32 {
                assert!((w[i] - w[32 - i]).abs() < 1e-5, "{:?} asym at {}", kind, i);
            }
        }
    }

    #[test]
    fn test_hann_starts_at_zero() {
        let w = generate_window(WindowKind::Hann, 16);
        assert!(w[0].abs() < 1e-7);
        let w = generate_window(WindowKind::Hamming, 16);
        assert!((w[0] - 0.08).abs() < 1e-6);
    }

    #[test]
    fn test_bessel_i0() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-9);
        assert!((bessel_i0(1.0) - 1.2660658).abs() < 1e-6);
        assert!((bessel_i0(5.0) - 27.239872).abs() < 1e-3);
    }
}
