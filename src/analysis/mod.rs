//! Analysis suite. Every analyzer reads the mono sum (the stereo analyzer reads
//! the channel pair) and degrades to neutral values on silent or very short
//! input instead of failing.

pub mod dynamics;
pub mod fft;
pub mod harmonic;
pub mod loudness;
pub mod reference;
pub mod resonance;
pub mod spectrum;
pub mod stereo;
pub mod tilt;
pub mod transient;

use serde::Serialize;

use crate::audio::AudioSignal;
use crate::error::{MasterError, Result};
use dynamics::{ClippingReport, DynamicsAnalyzer, DynamicsProfile};
use harmonic::{HarmonicAnalyzer, HarmonicProfile};
use loudness::{LoudnessMeasurement, LoudnessMeter};
use reference::{ReferenceComparison, ReferenceMatcher, TrackProfile};
use resonance::{Resonance, ResonanceDetector};
use spectrum::{FrequencyBalance, SpectralAnalyzer, Spectrum};
use stereo::{StereoField, StereoFieldAnalyzer};
use tilt::{SpectralTilt, SpectralTiltAnalyzer};
use transient::{OnsetDetector, TransientAnalyzer, TransientProfile};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Onsets measured by the transient analyzer.
    pub max_transients: usize,
    /// Resonances listed in the log.
    pub logged_resonances: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_transients: transient::MAX_TRANSIENTS,
            logged_resonances: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TrackInfo {
    pub sample_rate: u32,
    pub channels: usize,
    pub duration: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub track: TrackInfo,
    pub spectrum: Spectrum,
    pub frequency_balance: FrequencyBalance,
    pub loudness: LoudnessMeasurement,
    pub resonances: Vec<Resonance>,
    pub transients: TransientProfile,
    pub harmonics: HarmonicProfile,
    pub spectral_tilt: SpectralTilt,
    pub stereo: StereoField,
    pub dynamics: DynamicsProfile,
    pub clipping: ClippingReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceComparison>,
    /// 0-10.
    pub quality_score: f32,
}

/// Collects analyzer outputs; `build` fails if any required section is missing.
#[derive(Default)]
pub struct ReportBuilder {
    track: Option<TrackInfo>,
    spectrum: Option<Spectrum>,
    frequency_balance: Option<FrequencyBalance>,
    loudness: Option<LoudnessMeasurement>,
    resonances: Option<Vec<Resonance>>,
    transients: Option<TransientProfile>,
    harmonics: Option<HarmonicProfile>,
    spectral_tilt: Option<SpectralTilt>,
    stereo: Option<StereoField>,
    dynamics: Option<DynamicsProfile>,
    clipping: Option<ClippingReport>,
    reference: Option<ReferenceComparison>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(mut self, track: TrackInfo) -> Self {
        self.track = Some(track);
        self
    }

    pub fn spectrum(mut self, spectrum: Spectrum) -> Self {
        self.spectrum = Some(spectrum);
        self
    }

    pub fn frequency_balance(mut self, balance: FrequencyBalance) -> Self {
        self.frequency_balance = Some(balance);
        self
    }

    pub fn loudness(mut self, loudness: LoudnessMeasurement) -> Self {
        self.loudness = Some(loudness);
        self
    }

    pub fn resonances(mut self, resonances: Vec<Resonance>) -> Self {
        self.resonances = Some(resonances);
        self
    }

    pub fn transients(mut self, transients: TransientProfile) -> Self {
        self.transients = Some(transients);
        self
    }

    pub fn harmonics(mut self, harmonics: HarmonicProfile) -> Self {
        self.harmonics = Some(harmonics);
        self
    }

    pub fn spectral_tilt(mut self, tilt: SpectralTilt) -> Self {
        self.spectral_tilt = Some(tilt);
        self
    }

    pub fn stereo(mut self, stereo: StereoField) -> Self {
        self.stereo = Some(stereo);
        self
    }

    pub fn dynamics(mut self, dynamics: DynamicsProfile) -> Self {
        self.dynamics = Some(dynamics);
        self
    }

    pub fn clipping(mut self, clipping: ClippingReport) -> Self {
        self.clipping = Some(clipping);
        self
    }

    pub fn reference(mut self, reference: ReferenceComparison) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn build(self) -> Result<AnalysisReport> {
        let loudness = self.loudness.ok_or(MasterError::IncompleteReport("loudness"))?;
        let frequency_balance = self
            .frequency_balance
            .ok_or(MasterError::IncompleteReport("frequency balance"))?;
        let stereo = self.stereo.ok_or(MasterError::IncompleteReport("stereo field"))?;
        let dynamics = self.dynamics.ok_or(MasterError::IncompleteReport("dynamics"))?;
        let clipping = self.clipping.ok_or(MasterError::IncompleteReport("clipping"))?;

        let quality_score = quality_score(&loudness, &frequency_balance, &stereo, &dynamics, &clipping);

        Ok(AnalysisReport {
            track: self.track.ok_or(MasterError::IncompleteReport("track info"))?,
            spectrum: self.spectrum.ok_or(MasterError::IncompleteReport("spectrum"))?,
            frequency_balance,
            loudness,
            resonances: self.resonances.ok_or(MasterError::IncompleteReport("resonances"))?,
            transients: self.transients.ok_or(MasterError::IncompleteReport("transients"))?,
            harmonics: self.harmonics.ok_or(MasterError::IncompleteReport("harmonics"))?,
            spectral_tilt: self
                .spectral_tilt
                .ok_or(MasterError::IncompleteReport("spectral tilt"))?,
            stereo,
            dynamics,
            clipping,
            reference: self.reference,
            quality_score,
        })
    }
}

/// Start at 10 and deduct fixed penalties.
pub fn quality_score(
    loudness: &LoudnessMeasurement,
    balance: &FrequencyBalance,
    stereo: &StereoField,
    dynamics: &DynamicsProfile,
    clipping: &ClippingReport,
) -> f32 {
    let mut score = 10.0f32;
    if loudness.integrated_lufs < -18.0 {
        score -= 2.0;
    }
    if loudness.integrated_lufs > -8.0 {
        score -= 3.0;
    }
    if balance.balance_score < 0.7 {
        score -= 2.0;
    }
    if clipping.has_clipping {
        score -= 3.0;
    }
    if dynamics.needs_compression {
        score -= 1.0;
    }
    if stereo.width < 0.3 && !stereo.is_mono {
        score -= 1.0;
    }
    score.clamp(0.0, 10.0)
}

/// Run the full suite on `signal`, plus reference matching when a reference
/// track is given.
pub fn analyze(
    signal: &AudioSignal,
    onsets: &dyn OnsetDetector,
    reference: Option<&AudioSignal>,
    options: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let mono = signal.mono_sum();
    let sr = signal.sample_rate();

    log::info!(
        "Analyzing {:.1}s @ {} Hz, {} channel(s)",
        signal.duration(),
        sr,
        signal.channel_count()
    );

    let spectrum = SpectralAnalyzer::third_octave(&mono, sr);
    let frequency_balance = SpectralAnalyzer::quick_scan(&mono, sr);
    let loudness = LoudnessMeter::measure(&mono, sr);
    log::info!("Integrated loudness: {:.1} LUFS", loudness.integrated_lufs);

    let resonances = ResonanceDetector::detect(&mono, sr);
    ResonanceDetector::log_summary(&resonances, options.logged_resonances);

    let transients = TransientAnalyzer::new(onsets)
        .with_limit(options.max_transients)
        .analyze(&mono, sr);
    let stereo = StereoFieldAnalyzer::analyze(signal);
    let dynamics = DynamicsAnalyzer::analyze(&mono);

    // Reference matching reuses the measurements already taken above
    let comparison = reference.map(|reference| {
        log::info!("Comparing against reference track");
        let input = TrackProfile {
            spectrum: spectrum.clone(),
            integrated_lufs: loudness.integrated_lufs,
            stereo_width: stereo.width,
            crest_factor_db: dynamics.crest_factor_db,
        };
        ReferenceMatcher::compare(&input, &TrackProfile::measure(reference))
    });

    let mut builder = ReportBuilder::new()
        .track(TrackInfo {
            sample_rate: sr,
            channels: signal.channel_count(),
            duration: signal.duration(),
        })
        .spectrum(spectrum)
        .frequency_balance(frequency_balance)
        .loudness(loudness)
        .resonances(resonances)
        .transients(transients)
        .harmonics(HarmonicAnalyzer::analyze(&mono, sr))
        .spectral_tilt(SpectralTiltAnalyzer::analyze(&mono, sr))
        .stereo(stereo)
        .dynamics(dynamics)
        .clipping(DynamicsAnalyzer::detect_clipping(&mono));

    if let Some(comparison) = comparison {
        builder = builder.reference(comparison);
    }

    let report = builder.build()?;
    log::info!("Quality score: {:.1}/10", report.quality_score);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};
    use transient::SpectralFluxOnsets;

    #[test]
    fn silent_input_degrades_to_neutral_values() {
        let signal = AudioSignal::stereo(vec![0.0; 44100 * 4], vec![0.0; 44100 * 4], 44100).unwrap();
        let report = analyze(&signal, &SpectralFluxOnsets, None, &AnalysisOptions::default()).unwrap();

        assert_eq!(report.loudness.integrated_lufs, -80.0);
        assert_eq!(report.stereo.width, 0.0);
        assert_eq!(report.dynamics.crest_factor_db, 0.0);
        assert!(report.resonances.is_empty());
        assert_eq!(report.transients.count, 0);
        assert!(report.spectrum.bands.iter().all(|b| b.percentage == 0.0));
        assert!(report.spectrum.bands.iter().all(|b| b.db == -80.0));
        assert!(report.reference.is_none());
    }

    #[test]
    fn report_serializes_with_reference() {
        let sr = 22050;
        let signal = AudioSignal::mono(noise(0.3, sr as usize * 2, 1), sr).unwrap();
        let reference = AudioSignal::mono(sine(440.0, 0.5, sr, 2.0), sr).unwrap();
        let report =
            analyze(&signal, &SpectralFluxOnsets, Some(&reference), &AnalysisOptions::default())
                .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["track"]["channels"], 1);
        assert_eq!(json["spectrum"]["bands"].as_array().unwrap().len(), 31);
        assert!(json["reference"]["eq_suggestions"].is_array());
        assert!(json["quality_score"].as_f64().unwrap() <= 10.0);
    }

    #[test]
    fn self_reference_matches_exactly() {
        let sr = 22050;
        let left = noise(0.3, sr as usize * 2, 4);
        let right: Vec<f32> = left
            .iter()
            .zip(noise(0.1, sr as usize * 2, 5))
            .map(|(l, n)| l + n)
            .collect();
        let signal = AudioSignal::stereo(left, right, sr).unwrap();
        let report =
            analyze(&signal, &SpectralFluxOnsets, Some(&signal), &AnalysisOptions::default())
                .unwrap();

        let comparison = report.reference.unwrap();
        assert!(comparison.band_deltas.iter().all(|b| b.delta_db == 0.0));
        assert!(comparison.eq_suggestions.is_empty());
        assert_eq!(comparison.lufs_delta, 0.0);
        assert_eq!(comparison.width_delta, 0.0);
        assert_eq!(comparison.dynamics_delta, 0.0);
    }

    #[test]
    fn builder_rejects_missing_sections() {
        let err = ReportBuilder::new().build().unwrap_err();
        assert!(matches!(err, MasterError::IncompleteReport(_)));
    }

    #[test]
    fn quality_penalties_accumulate() {
        let signal = AudioSignal::stereo(vec![0.0; 4096], vec![0.0; 4096], 44100).unwrap();
        let report = analyze(&signal, &SpectralFluxOnsets, None, &AnalysisOptions::default()).unwrap();
        // Too quiet (-2), narrow stereo (-1); silence has no balance issues but
        // scores 0 against the ideal curve (-2)
        assert_eq!(report.quality_score, 5.0);
    }
}
