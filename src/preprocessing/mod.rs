//! Signal preprocessing modules
//!
//! This module contains utilities for preparing signals before the transform:
//! - Analysis window generation
//! - Channel mixing (stereo to sum and difference)

pub mod channel_mixer;
pub mod window;
