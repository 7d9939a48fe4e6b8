//! Audio analysis and platform-targeted mastering.
//!
//! [`analysis::analyze`] measures a decoded [`AudioSignal`] and returns an
//! [`analysis::AnalysisReport`]. [`master::MasteringChain`] runs the EQ,
//! compression, stereo, saturation and limiting stages for a
//! [`master::preset::Platform`] and hands the result to an external
//! loudness normalizer.

pub mod analysis;
pub mod audio;
pub mod biquad;
pub mod encode;
pub mod error;
pub mod master;

pub use audio::AudioSignal;
pub use error::{MasterError, Result};
