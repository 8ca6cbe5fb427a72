//! Configuration parameters for spectral losses
//!
//! Every loss is built from one of the config structs below. Configs are
//! plain data (serde-friendly) and are validated once, when the loss is
//! constructed.

use crate::error::{LossError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Analysis window applied to each STFT frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    /// Hann (raised cosine)
    #[serde(alias = "hann_window")]
    Hann,
    /// Bartlett (triangular)
    #[serde(alias = "bartlett_window")]
    Bartlett,
    /// Blackman
    #[serde(alias = "blackman_window")]
    Blackman,
    /// Hamming
    #[serde(alias = "hamming_window")]
    Hamming,
    /// Kaiser with beta = 12
    #[serde(alias = "kaiser_window")]
    Kaiser,
}

impl WindowKind {
    /// All supported windows, in the default sampling order
    pub const ALL: [WindowKind; 5] = [
        WindowKind::Hann,
        WindowKind::Bartlett,
        WindowKind::Blackman,
        WindowKind::Hamming,
        WindowKind::Kaiser,
    ];

    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            WindowKind::Hann => "hann",
            WindowKind::Bartlett => "bartlett",
            WindowKind::Blackman => "blackman",
            WindowKind::Hamming => "hamming",
            WindowKind::Kaiser => "kaiser",
        }
    }
}

impl FromStr for WindowKind {
    type Err = LossError;

    /// Accepts both `hann` and the `hann_window` spelling
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let name = name.strip_suffix("_window").unwrap_or(&name);
        WindowKind::ALL
            .iter()
            .copied()
            .find(|w| w.name() == name)
            .ok_or_else(|| LossError::InvalidConfig(format!("Unknown window: {:?}", s)))
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Optional remapping of the frequency axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyScale {
    /// Linear STFT bins, no remapping
    #[default]
    None,
    /// Mel filterbank
    Mel,
    /// Chroma (pitch class) filterbank
    Chroma,
}

impl FromStr for FrequencyScale {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(FrequencyScale::None),
            "mel" => Ok(FrequencyScale::Mel),
            "chroma" => Ok(FrequencyScale::Chroma),
            other => Err(LossError::InvalidConfig(format!("Unknown frequency scale: {:?}", other))),
        }
    }
}

/// Aggregation applied to the raw loss
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    /// Return the loss unchanged
    None,
    /// Arithmetic mean over all elements
    #[default]
    Mean,
    /// Sum over all elements
    Sum,
}

impl FromStr for Reduction {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Reduction::None),
            "mean" => Ok(Reduction::Mean),
            "sum" => Ok(Reduction::Sum),
            other => Err(LossError::InvalidConfig(format!("Unknown reduction: {:?}", other))),
        }
    }
}

/// Shape of the value returned by `evaluate`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Aggregate loss only
    #[default]
    Loss,
    /// Aggregate loss plus intermediate terms
    Full,
}

impl FromStr for OutputMode {
    type Err = LossError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loss" => Ok(OutputMode::Loss),
            "full" => Ok(OutputMode::Full),
            other => Err(LossError::InvalidConfig(format!("Unknown output mode: {:?}", other))),
        }
    }
}

/// One STFT analysis grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolution {
    /// FFT size in samples (default: 1024)
    pub fft_size: usize,

    /// Hop between frames in samples (default: 256)
    pub hop_size: usize,

    /// Analysis window length in samples, at most `fft_size` (default: 1024)
    pub win_length: usize,

    /// Window function (default: Hann)
    pub window: WindowKind,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            hop_size: 256,
            win_length: 1024,
            window: WindowKind::Hann,
        }
    }
}

impl Resolution {
    /// Build a resolution
    pub fn new(fft_size: usize, hop_size: usize, win_length: usize, window: WindowKind) -> Self {
        Self {
            fft_size,
            hop_size,
            win_length,
            window,
        }
    }

    /// Number of one-sided frequency bins (`fft_size / 2 + 1`)
    pub fn n_freqs(&self) -> usize {
        self.fft_size / 2 + 1
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.fft_size == 0 {
            return Err(LossError::InvalidConfig("fft_size must be > 0".to_string()));
        }
        if self.hop_size == 0 {
            return Err(LossError::InvalidConfig("hop_size must be > 0".to_string()));
        }
        if self.win_length == 0 {
            return Err(LossError::InvalidConfig("win_length must be > 0".to_string()));
        }
        if self.win_length > self.fft_size {
            return Err(LossError::InvalidConfig(format!(
                "win_length ({}) must not exceed fft_size ({})",
                self.win_length, self.fft_size
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fft={} hop={} win={} ({})",
            self.fft_size, self.hop_size, self.win_length, self.window
        )
    }
}

/// Term weights and behaviour flags shared by every resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossOptions {
    /// Weight of the spectral convergence term (default: 1.0)
    pub w_sc: f32,

    /// Weight of the log magnitude term (default: 1.0)
    pub w_mag: f32,

    /// Weight of a spectral phase term (default: 0.0)
    ///
    /// Reserved. No phase term is computed, so this weight has no effect.
    pub w_phs: f32,

    /// Weight of the log real-part term, only computed when > 0 (default: 0.0)
    pub w_real: f32,

    /// Weight of the log imaginary-part term, only computed when > 0 (default: 0.0)
    pub w_imag: f32,

    /// Sample rate in Hz, required when `scale` is not `None`
    pub sample_rate: Option<u32>,

    /// Frequency axis remapping (default: None)
    pub scale: FrequencyScale,

    /// Number of mel/chroma bins, required when `scale` is not `None`
    pub n_bins: Option<usize>,

    /// Rescale the target magnitude to best fit the estimate (default: false)
    pub scale_invariance: bool,

    /// Floor applied to magnitudes and real/imag parts (default: 1e-8)
    pub eps: f32,

    /// Loss only, or loss plus terms (default: Loss)
    pub output: OutputMode,

    /// Reduction applied to the weighted loss (default: Mean)
    pub reduction: Reduction,
}

impl Default for LossOptions {
    fn default() -> Self {
        Self {
            w_sc: 1.0,
            w_mag: 1.0,
            w_phs: 0.0,
            w_real: 0.0,
            w_imag: 0.0,
            sample_rate: None,
            scale: FrequencyScale::None,
            n_bins: None,
            scale_invariance: false,
            eps: 1e-8,
            output: OutputMode::Loss,
            reduction: Reduction::Mean,
        }
    }
}

impl LossOptions {
    /// Check the options against the FFT size they will be used with
    pub(crate) fn validate(&self, fft_size: usize) -> Result<()> {
        if self.eps.is_nan() || self.eps <= 0.0 {
            return Err(LossError::InvalidConfig(format!("eps must be > 0, got {}", self.eps)));
        }
        if self.scale != FrequencyScale::None {
            if self.sample_rate.unwrap_or(0) == 0 {
                return Err(LossError::InvalidConfig(format!(
                    "sample_rate must be set to use {:?} scale",
                    self.scale
                )));
            }
            let n_bins = self.n_bins.ok_or_else(|| {
                LossError::InvalidConfig(format!(
                    "n_bins must be set to use {:?} scale",
                    self.scale
                ))
            })?;
            if n_bins == 0 {
                return Err(LossError::InvalidConfig("n_bins must be > 0".to_string()));
            }
            if n_bins > fft_size {
                return Err(LossError::InvalidConfig(format!(
                    "n_bins ({}) must not exceed fft_size ({})",
                    n_bins, fft_size
                )));
            }
        }
        Ok(())
    }
}

/// Single resolution STFT loss configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StftLossConfig {
    /// Analysis grid
    #[serde(flatten)]
    pub resolution: Resolution,

    /// Weights and flags
    #[serde(flatten)]
    pub options: LossOptions,
}

/// Multi resolution STFT loss configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiResolutionConfig {
    /// FFT sizes, one per resolution (default: [1024, 2048, 512])
    pub fft_sizes: Vec<usize>,

    /// Hop sizes, one per resolution (default: [120, 240, 50])
    pub hop_sizes: Vec<usize>,

    /// Window lengths, one per resolution (default: [600, 1200, 240])
    pub win_lengths: Vec<usize>,

    /// Window shared by every resolution (default: Hann)
    pub window: WindowKind,

    /// Weights and flags shared by every resolution
    #[serde(flatten)]
    pub options: LossOptions,
}

impl Default for MultiResolutionConfig {
    fn default() -> Self {
        Self {
            fft_sizes: vec![1024, 2048, 512],
            hop_sizes: vec![120, 240, 50],
            win_lengths: vec![600, 1200, 240],
            window: WindowKind::Hann,
            options: LossOptions::default(),
        }
    }
}

impl MultiResolutionConfig {
    /// Zip the parallel lists into resolutions
    ///
    /// # Errors
    ///
    /// Returns `LossError::InvalidConfig` if the lists differ in length or are empty
    pub fn resolutions(&self) -> Result<Vec<Resolution>> {
        if self.fft_sizes.len() != self.hop_sizes.len()
            || self.fft_sizes.len() != self.win_lengths.len()
        {
            return Err(LossError::InvalidConfig(format!(
                "Resolution lists must have equal length: \
                 fft_sizes={}, hop_sizes={}, win_lengths={}",
                self.fft_sizes.len(),
                self.hop_sizes.len(),
                self.win_lengths.len()
            )));
        }
        if self.fft_sizes.is_empty() {
            return Err(LossError::InvalidConfig("At least one resolution is required".to_string()));
        }

        Ok(self
            .fft_sizes
            .iter()
            .zip(&self.hop_sizes)
            .zip(&self.win_lengths)
            .map(|((&fft, &hop), &win)| Resolution::new(fft, hop, win, self.window))
            .collect())
    }
}

/// Random resolution STFT loss configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomResolutionConfig {
    /// Number of resolutions sampled per randomization (default: 3)
    pub resolutions: usize,

    /// Smallest FFT size (default: 16)
    pub min_fft_size: usize,

    /// Largest FFT size, exclusive when sampling (default: 32768)
    pub max_fft_size: usize,

    /// Smallest hop as a fraction of the FFT size (default: 0.1)
    pub min_hop_size: f32,

    /// Largest hop as a fraction of the FFT size (default: 1.0)
    pub max_hop_size: f32,

    /// Windows to sample from (default: all five)
    pub windows: Vec<WindowKind>,

    /// Number of evaluations between randomizations (default: 1)
    pub randomize_rate: usize,

    /// Weights and flags shared by every sampled resolution
    #[serde(flatten)]
    pub options: LossOptions,
}

impl Default for RandomResolutionConfig {
    fn default() -> Self {
        Self {
            resolutions: 3,
            min_fft_size: 16,
            max_fft_size: 32768,
            min_hop_size: 0.1,
            max_hop_size: 1.0,
            windows: WindowKind::ALL.to_vec(),
            randomize_rate: 1,
            options: LossOptions::default(),
        }
    }
}

impl RandomResolutionConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.resolutions == 0 {
            return Err(LossError::InvalidConfig("resolutions must be > 0".to_string()));
        }
        if self.min_fft_size == 0
            || self.max_fft_size <= self.min_fft_size
            || self.max_fft_size.ilog2() <= self.min_fft_size.ilog2()
        {
            return Err(LossError::InvalidConfig(format!(
                "FFT size range is empty: min={}, max={}",
                self.min_fft_size, self.max_fft_size
            )));
        }
        if !(self.min_hop_size > 0.0
            && self.min_hop_size <= self.max_hop_size
            && self.max_hop_size <= 1.0)
        {
            return Err(LossError::InvalidConfig(format!(
                "Hop fractions must satisfy 0 < min <= max <= 1: min={}, max={}",
                self.min_hop_size, self.max_hop_size
            )));
        }
        if self.windows.is_empty() {
            return Err(LossError::InvalidConfig("windows must not be empty".to_string()));
        }
        if self.randomize_rate == 0 {
            return Err(LossError::InvalidConfig("randomize_rate must be > 0".to_string()));
        }
        if self.options.eps.is_nan() || self.options.eps <= 0.0 {
            return Err(LossError::InvalidConfig(format!(
                "eps must be > 0, got {}",
                self.options.eps
            )));
        }
        Ok(())
    }
}

/// Sum and difference (stereo) STFT loss configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SumAndDifferenceConfig {
    /// FFT sizes, one per resolution (default: [1024, 2048, 512])
    pub fft_sizes: Vec<usize>,

    /// Hop sizes, one per resolution (default: [120, 240, 50])
    pub hop_sizes: Vec<usize>,

    /// Window lengths, one per resolution (default: [600, 1200, 240])
    pub win_lengths: Vec<usize>,

    /// Window shared by every resolution (default: Hann)
    pub window: WindowKind,

    /// Weight of the sum (mid) loss (default: 1.0)
    pub w_sum: f32,

    /// Weight of the difference (side) loss (default: 1.0)
    pub w_diff: f32,

    /// Loss only, or loss plus sum/diff terms (default: Loss)
    pub output: OutputMode,
}

impl Default for SumAndDifferenceConfig {
    fn default() -> Self {
        Self {
            fft_sizes: vec![1024, 2048, 512],
            hop_sizes: vec![120, 240, 50],
            win_lengths: vec![600, 1200, 240],
            window: WindowKind::Hann,
            w_sum: 1.0,
            w_diff: 1.0,
            output: OutputMode::Loss,
        }
    }
}
