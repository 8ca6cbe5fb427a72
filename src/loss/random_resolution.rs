//! Random resolution STFT loss
//!
//! Like the multi-resolution loss, but the analysis grids are redrawn every
//! `randomize_rate` evaluations so a model cannot overfit a fixed set of
//! STFT configurations.
//!
//! # Sampling
//!
//! For each of the `resolutions` members:
//! 1. `fft_size = 2^u`, `u` uniform over `[log2(min_fft_size), log2(max_fft_size))`
//! 2. `hop_size = floor(fft_size · r)`, `r` uniform over `[min_hop_size, max_hop_size)`
//! 3. `win_length = floor(fft_size · c)`, `c` uniform over `{1.0, 0.5, 0.25}`
//! 4. `window` uniform over the configured windows
//!
//! # Reference
//!
//! Steinmetz, C. J., & Reiss, J. D. (2020). auraloss: Audio focused loss functions
//! in PyTorch. *Digital Music Research Network One-day Workshop (DMRN+15)*.

use super::multi_resolution::average_losses;
use super::stft_loss::StftLoss;
use super::{flatten_pair, LossOutput, SpectralTerms};
use crate::config::{LossOptions, OutputMode, RandomResolutionConfig, Resolution};
use crate::error::{LossError, Result};
use ndarray::{ArrayBase, Data, Dimension};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Window length as a fraction of the FFT size
const WINDOW_FRACTIONS: [f64; 3] = [1.0, 0.5, 0.25];

/// Source of randomness for resolution sampling
///
/// Implemented for every `rand::Rng`; tests can supply a scripted source.
pub trait RandomSource {
    /// Uniform integer in `0..upper` (`upper > 0`)
    fn next_index(&mut self, upper: usize) -> usize;

    /// Uniform float in `[0, 1)`
    fn next_unit(&mut self) -> f64;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn next_index(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }

    fn next_unit(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// STFT loss averaged over randomly drawn resolutions
///
/// `evaluate` takes `&mut self`: the check-resample-evaluate-count sequence
/// is one state transition and needs exclusive access. Wrap the loss in a
/// `Mutex` to share it between workers.
#[derive(Debug)]
pub struct RandomResolutionStftLoss<R = StdRng> {
    config: RandomResolutionConfig,
    member_options: LossOptions,
    rng: R,
    losses: Vec<StftLoss>,
    nforwards: u64,
}

impl RandomResolutionStftLoss<StdRng> {
    /// Build with an entropy-seeded generator
    pub fn new(config: RandomResolutionConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Build with a deterministic generator
    pub fn with_seed(config: RandomResolutionConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: RandomSource> RandomResolutionStftLoss<R> {
    /// Build with a caller-supplied random source and draw the first resolutions
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if the sampling ranges are empty,
    /// the window list is empty, `randomize_rate` is zero, or a drawn
    /// resolution is incompatible with the shared options (e.g. `n_bins`
    /// larger than a drawn FFT size)
    pub fn with_rng(config: RandomResolutionConfig, rng: R) -> Result<Self> {
        config.validate()?;

        let member_options = LossOptions {
            output: OutputMode::Loss,
            ..config.options.clone()
        };

        let mut loss = Self {
            config,
            member_options,
            rng,
            losses: Vec::new(),
            nforwards: 0,
        };
        loss.randomize()?;
        Ok(loss)
    }

    /// Number of completed evaluations
    pub fn nforwards(&self) -> u64 {
        self.nforwards
    }

    /// Resolutions of the current members
    pub fn resolutions(&self) -> Vec<Resolution> {
        self.losses.iter().map(|l| *l.resolution()).collect()
    }

    /// Current member losses
    pub fn losses(&self) -> &[StftLoss] {
        &self.losses
    }

    /// Configuration this loss samples from
    pub fn config(&self) -> &RandomResolutionConfig {
        &self.config
    }

    /// Discard every member and draw a fresh set
    pub fn randomize(&mut self) -> Result<()> {
        let resolutions: Vec<Resolution> = (0..self.config.resolutions)
            .map(|_| self.sample_resolution())
            .collect();

        let losses = resolutions
            .into_iter()
            .map(|resolution| StftLoss::from_parts(resolution, self.member_options.clone()))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "Randomized STFT resolutions after {} evaluations: [{}]",
            self.nforwards,
            losses
                .iter()
                .map(|l| l.resolution().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        self.losses = losses;
        Ok(())
    }

    fn sample_resolution(&mut self) -> Resolution {
        let lo = self.config.min_fft_size.ilog2() as usize;
        let hi = self.config.max_fft_size.ilog2() as usize;
        let fft_size = 1usize << (lo + self.rng.next_index(hi - lo));

        let (min_hop, max_hop) = (self.config.min_hop_size as f64, self.config.max_hop_size as f64);
        let hop_fraction = min_hop + self.rng.next_unit() * (max_hop - min_hop);
        let hop_size = ((fft_size as f64 * hop_fraction) as usize).max(1);

        let win_fraction = WINDOW_FRACTIONS[self.rng.next_index(WINDOW_FRACTIONS.len())];
        let win_length = ((fft_size as f64 * win_fraction) as usize).max(1);

        let window = self.config.windows[self.rng.next_index(self.config.windows.len())];

        Resolution::new(fft_size, hop_size, win_length, window)
    }

    /// Evaluate the loss, redrawing resolutions first when due
    ///
    /// Resolutions are redrawn when `nforwards % randomize_rate == 0`;
    /// `nforwards` is incremented after a successful evaluation.
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidInput` if either signal is not longer than
    /// `max_fft_size` or the shapes differ. Nothing is redrawn or counted
    /// when validation fails.
    pub fn evaluate<S, D>(
        &mut self,
        input: &ArrayBase<S, D>,
        target: &ArrayBase<S, D>,
    ) -> Result<LossOutput<SpectralTerms>>
    where
        S: Data<Elem = f32>,
        D: Dimension,
    {
        let max_fft_size = self.config.max_fft_size;
        for (name, signal_len) in [
            ("Input", input.shape().last().copied().unwrap_or(0)),
            ("Target", target.shape().last().copied().unwrap_or(0)),
        ] {
            if signal_len <= max_fft_size {
                return Err(LossError::InvalidInput(format!(
                    "{} length ({}) must be larger than largest FFT size ({})",
                    name, signal_len, max_fft_size
                )));
            }
        }

        let (x, y) = flatten_pair(input, target)?;

        if self.nforwards % self.config.randomize_rate as u64 == 0 {
            self.randomize()?;
        }

        let (loss, terms) = average_losses(&self.losses, x.view(), y.view())?;
        self.nforwards += 1;

        Ok(LossOutput::new(self.config.options.output, loss, terms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FrequencyScale, WindowKind};
    use ndarray::Array3;
    use std::collections::VecDeque;

    /// Replays fixed draws
    struct ScriptedSource {
        indices: VecDeque<usize>,
        units: VecDeque<f64>,
    }

    impl ScriptedSource {
        fn new(indices: &[usize], units: &[f64]) -> Self {
            Self {
                indices: indices.iter().copied().collect(),
                units: units.iter().copied().collect(),
            }
        }
    }

    impl RandomSource for ScriptedSource {
        fn next_index(&mut self, upper: usize) -> usize {
            let i = self.indices.pop_front().unwrap_or(0);
            assert!(i < upper, "scripted index {} out of range {}", i, upper);
            i
        }

        fn next_unit(&mut self) -> f64 {
            self.units.pop_front().unwrap_or(0.0)
        }
    }

    fn small_config() -> RandomResolutionConfig {
        RandomResolutionConfig {
            resolutions: 2,
            min_fft_size: 64,
            max_fft_size: 1024,
            ..Default::default()
        }
    }

    fn ramp(len: usize, scale: f32) -> Array3<f32> {
        Array3::from_shape_fn((1, 1, len), |(_, _, t)| {
            ((t as f32 * 0.37).sin() + (t as f32 * 0.011).cos()) * scale
        })
    }

    #[test]
    fn test_scripted_sampling() {
        // per member: fft exponent, hop unit, window fraction, window
        let source = ScriptedSource::new(&[2, 1, 3, 0, 2, 4], &[0.5, 0.0]);
        let loss = RandomResolutionStftLoss::with_rng(small_config(), source).unwrap();

        assert_eq!(
            loss.resolutions(),
            vec![
                // 2^(6+2) = 256, hop = 256 * (0.1 + 0.5 * 0.9) = 140, win = 128
                Resolution::new(256, 140, 128, WindowKind::Hamming),
                // 2^6 = 64, hop = floor(64 * 0.1) = 6, win = 16
                Resolution::new(64, 6, 16, WindowKind::Kaiser),
            ]
        );
    }

    #[test]
    fn test_sampled_ranges() {
        let mut loss = RandomResolutionStftLoss::with_seed(small_config(), 42).unwrap();
        for _ in 0..50 {
            loss.randomize().unwrap();
            for res in loss.resolutions() {
                assert!(res.fft_size.is_power_of_two());
                assert!(res.fft_size >= 64 && res.fft_size < 1024);
                assert!(res.hop_size >= 1 && res.hop_size <= res.fft_size);
                let windows = [res.fft_size, res.fft_size / 2, res.fft_size / 4];
                assert!(windows.contains(&res.win_length));
            }
        }
    }

    #[test]
    fn test_length_validation() {
        let mut loss = RandomResolutionStftLoss::with_seed(small_config(), 1).unwrap();
        let exact = ramp(1024, 1.0);
        let err = loss.evaluate(&exact, &exact).unwrap_err();
        assert_eq!(
            err,
            LossError::InvalidInput(
                "Input length (1024) must be larger than largest FFT size (1024)".to_string()
            )
        );
        assert_eq!(loss.nforwards(), 0);

        let ok = ramp(1025, 1.0);
        assert!(loss.evaluate(&ok, &ok).is_ok());
        assert_eq!(loss.nforwards(), 1);
    }

    #[test]
    fn test_target_length_reported() {
        let mut loss = RandomResolutionStftLoss::with_seed(small_config(), 1).unwrap();
        let x = ramp(2048, 1.0);
        let y = ramp(512, 1.0);
        match loss.evaluate(&x, &y) {
            Err(LossError::InvalidInput(msg)) => assert!(msg.starts_with("Target length (512)")),
            other => panic!("expected target length error, got {:?}", other),
        }
    }

    #[test]
    fn test_randomize_rate() {
        let config = RandomResolutionConfig {
            resolutions: 4,
            randomize_rate: 3,
            ..small_config()
        };
        let mut loss = RandomResolutionStftLoss::with_seed(config, 7).unwrap();
        let x = ramp(2048, 1.0);
        let y = ramp(2048, 0.5);

        // call 0 resamples; calls 1 and 2 keep the same members
        loss.evaluate(&x, &y).unwrap();
        let first = loss.resolutions();
        loss.evaluate(&x, &y).unwrap();
        loss.evaluate(&x, &y).unwrap();
        assert_eq!(loss.resolutions(), first);
        assert_eq!(loss.nforwards(), 3);

        // call 3 resamples
        loss.evaluate(&x, &y).unwrap();
        assert_ne!(loss.resolutions(), first);
        assert_eq!(loss.nforwards(), 4);
    }

    #[test]
    fn test_identity_is_zero() {
        let mut loss = RandomResolutionStftLoss::with_seed(small_config(), 3).unwrap();
        let x = ramp(4096, 1.0);
        for _ in 0..5 {
            assert!(loss.evaluate(&x, &x).unwrap().loss().abs() < 1e-5);
        }
    }

    #[test]
    fn test_scaled_members_propagate_errors() {
        // 128 mel bands cannot fit a 64-point FFT
        let config = RandomResolutionConfig {
            options: LossOptions {
                scale: FrequencyScale::Mel,
                sample_rate: Some(16000),
                n_bins: Some(128),
                ..Default::default()
            },
            ..small_config()
        };
        let source = ScriptedSource::new(&[0, 0, 0], &[0.5]);
        assert!(matches!(
            RandomResolutionStftLoss::with_rng(config, source),
            Err(LossError::InvalidConfig(_))
        ));
    }
}
