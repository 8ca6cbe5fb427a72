//! Feature extraction modules
//!
//! This module contains the spectral front end shared by every loss:
//! - Short-time Fourier transform (centered, reflect padded)
//! - Mel filterbank (Slaney)
//! - Chroma filterbank

pub mod chroma;
pub mod mel;
pub mod stft;
