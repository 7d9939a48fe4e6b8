pub mod auto;
pub mod compressor;
pub mod filter_bank;
pub mod limiter;
pub mod preset;
pub mod saturation;
pub mod stereo;

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::audio::signal::amplitude_to_db;
use crate::audio::wav::{write_wav, WavFormat};
use crate::audio::AudioSignal;
use crate::encode::{LoudnessNormalizer, LoudnessTarget, Transcoder};
use crate::error::Result;

use auto::AutoDecision;
use compressor::Compressor;
use filter_bank::FilterBank;
use limiter::TruePeakLimiter;
use preset::{MasteringParams, Platform, UserParams};
use saturation::Saturator;
use stereo::StereoProcessor;

/// Working buffer owned by one run and threaded through every stage.
#[derive(Clone, Debug, PartialEq)]
pub struct MasteringState {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl MasteringState {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    pub fn from_signal(signal: &AudioSignal) -> Self {
        Self::new(signal.channels().to_vec(), signal.sample_rate())
    }

    pub fn is_stereo(&self) -> bool {
        self.channels.len() >= 2
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainStage {
    Equalize,
    Compress,
    Stereo,
    Saturate,
    Limit,
    Normalize,
}

impl ChainStage {
    pub const ALL: [ChainStage; 6] = [
        ChainStage::Equalize,
        ChainStage::Compress,
        ChainStage::Stereo,
        ChainStage::Saturate,
        ChainStage::Limit,
        ChainStage::Normalize,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChainStage::Equalize => "EQ",
            ChainStage::Compress => "Compression",
            ChainStage::Stereo => "Stereo",
            ChainStage::Saturate => "Saturation",
            ChainStage::Limit => "Limiting",
            ChainStage::Normalize => "Normalization",
        }
    }
}

/// What the chain left on disk.
#[derive(Clone, Debug, PartialEq)]
pub struct MasteringOutcome {
    pub output: PathBuf,
    /// Normalization failed and the limited buffer was written as 24-bit PCM.
    pub degraded: bool,
    /// Oversampled peak of the limited buffer, dBTP.
    pub limited_true_peak_db: f32,
}

pub struct MasteringChain {
    params: MasteringParams,
    muddy_correction: bool,
}

impl MasteringChain {
    pub fn new(params: MasteringParams) -> Self {
        Self {
            params,
            muddy_correction: false,
        }
    }

    /// Enable the fixed 300 Hz cut for tracks flagged with muddy low-mids.
    pub fn with_muddy_correction(mut self, muddy: bool) -> Self {
        self.muddy_correction = muddy;
        self
    }

    pub fn params(&self) -> &MasteringParams {
        &self.params
    }

    /// Run the in-memory stages. `progress` is called as each stage starts.
    /// Returns the limited buffer and its linear true peak.
    pub fn process(
        &self,
        signal: &AudioSignal,
        progress: &mut dyn FnMut(ChainStage),
    ) -> (MasteringState, f32) {
        let state = MasteringState::from_signal(signal);
        let sr = state.sample_rate;

        progress(ChainStage::Equalize);
        let bank = FilterBank::plan(&self.params, sr, state.is_stereo(), self.muddy_correction);
        let state = bank.process(state);

        progress(ChainStage::Compress);
        let state = Compressor::from_params(&self.params, sr).process(state);

        progress(ChainStage::Stereo);
        let state = StereoProcessor::from_params(&self.params).process(state);

        progress(ChainStage::Saturate);
        let state = Saturator::new(self.params.saturation).process(state);

        progress(ChainStage::Limit);
        TruePeakLimiter {
            ceiling: self.params.true_peak_linear(),
        }
        .process(state)
    }

    /// Process, then hand the limited buffer to `normalizer`. A normalizer
    /// failure is not fatal: the buffer is written unnormalized as 24-bit
    /// PCM and the outcome is marked degraded.
    pub fn render(
        &self,
        signal: &AudioSignal,
        output: &Path,
        normalizer: &dyn LoudnessNormalizer,
        progress: &mut dyn FnMut(ChainStage),
    ) -> Result<MasteringOutcome> {
        let (state, limited_peak) = self.process(signal, progress);
        let limited_true_peak_db = amplitude_to_db(limited_peak);

        progress(ChainStage::Normalize);
        let premaster = premaster_path(output);
        write_wav(&premaster, &state.channels, state.sample_rate, WavFormat::Float32)?;

        let target = LoudnessTarget {
            integrated_lufs: self.params.target_lufs,
            true_peak_db: self.params.true_peak_db,
            sample_rate: state.sample_rate,
        };
        let degraded = match normalizer.normalize(&premaster, output, &target) {
            Ok(()) => false,
            Err(e) => {
                log::warn!("Normalization failed, writing unnormalized 24-bit output: {}", e);
                write_wav(output, &state.channels, state.sample_rate, WavFormat::Pcm24)?;
                true
            }
        };

        if let Err(e) = std::fs::remove_file(&premaster) {
            log::warn!("Could not remove {}: {}", premaster.display(), e);
        }

        log::info!(
            "Mastered {} for {} ({})",
            output.display(),
            self.params.platform,
            if degraded { "degraded" } else { "normalized" }
        );
        Ok(MasteringOutcome {
            output: output.to_path_buf(),
            degraded,
            limited_true_peak_db,
        })
    }
}

/// Transcode `source` to `target`. Failure is logged and reported as `None`.
pub fn export_lossy(source: &Path, target: &Path, transcoder: &dyn Transcoder) -> Option<PathBuf> {
    match transcoder.transcode(source, target) {
        Ok(()) => Some(target.to_path_buf()),
        Err(e) => {
            log::warn!("Transcoding to {} failed: {}", target.display(), e);
            None
        }
    }
}

/// Intermediate float WAV written next to the final output.
fn premaster_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "master".into());
    output.with_file_name(format!("{}.premaster.wav", stem))
}

/// Serialized summary of one mastering run.
#[derive(Clone, Debug, Serialize)]
pub struct MasteringResult {
    pub success: bool,
    pub output: PathBuf,
    pub platform: Platform,
    pub target_lufs: f32,
    pub true_peak: f32,
    /// Measured after limiting, before normalization.
    pub limited_true_peak: f32,
    /// Overrides as supplied, before clamping.
    pub parameters: UserParams,
    pub resolved: MasteringParams,
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcoded: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto: Option<AutoDecision>,
}

impl MasteringResult {
    pub fn new(params: &MasteringParams, user: UserParams, outcome: MasteringOutcome) -> Self {
        Self {
            success: true,
            output: outcome.output,
            platform: params.platform,
            target_lufs: params.target_lufs,
            true_peak: params.true_peak_db,
            limited_true_peak: outcome.limited_true_peak_db,
            parameters: user,
            resolved: params.clone(),
            degraded: outcome.degraded,
            transcoded: None,
            auto: None,
        }
    }
}
