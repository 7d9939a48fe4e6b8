//! Differences between an input track and a reference track. Every delta is
//! `reference - input`, so swapping the two negates it.

use serde::Serialize;

use super::dynamics::DynamicsAnalyzer;
use super::loudness::LoudnessMeter;
use super::spectrum::{SpectralAnalyzer, Spectrum};
use super::stereo::StereoFieldAnalyzer;
use crate::audio::AudioSignal;

const EQ_SUGGESTION_DB: f32 = 1.5;
const SIGNIFICANT_DB: f32 = 2.5;
const WIDTH_TOLERANCE: f32 = 0.1;
const DYNAMICS_TOLERANCE_DB: f32 = 1.0;

/// The measurements of one track that reference matching compares.
#[derive(Clone, Debug)]
pub struct TrackProfile {
    pub spectrum: Spectrum,
    pub integrated_lufs: f32,
    pub stereo_width: f32,
    pub crest_factor_db: f32,
}

impl TrackProfile {
    pub fn measure(signal: &AudioSignal) -> Self {
        let mono = signal.mono_sum();
        let sr = signal.sample_rate();
        Self {
            spectrum: SpectralAnalyzer::third_octave(&mono, sr),
            integrated_lufs: LoudnessMeter::measure(&mono, sr).integrated_lufs,
            stereo_width: StereoFieldAnalyzer::analyze(signal).width,
            crest_factor_db: DynamicsAnalyzer::analyze(&mono).crest_factor_db,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EqAction {
    Boost,
    Cut,
}

#[derive(Clone, Debug, Serialize)]
pub struct EqSuggestion {
    pub frequency: f32,
    pub adjustment_db: f32,
    pub action: EqAction,
    /// Band share of the input's energy, in percent.
    pub input_energy: f32,
    pub reference_energy: f32,
    pub significant: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct BandDelta {
    pub center: f32,
    pub delta_db: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthAdvice {
    Widen,
    Narrow,
    MatchesWell,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicsAdvice {
    /// Reference has more crest factor: compress less.
    ReduceCompression,
    IncreaseCompression,
    MatchesWell,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReferenceComparison {
    pub band_deltas: Vec<BandDelta>,
    pub eq_suggestions: Vec<EqSuggestion>,
    /// Gain change needed to reach the reference loudness.
    pub lufs_delta: f32,
    pub width_delta: f32,
    pub width_advice: WidthAdvice,
    pub dynamics_delta: f32,
    pub dynamics_advice: DynamicsAdvice,
}

pub struct ReferenceMatcher;

impl ReferenceMatcher {
    pub fn compare(input: &TrackProfile, reference: &TrackProfile) -> ReferenceComparison {
        let mut band_deltas = Vec::with_capacity(input.spectrum.bands.len());
        let mut eq_suggestions = Vec::new();

        for (inp, refb) in input.spectrum.bands.iter().zip(&reference.spectrum.bands) {
            let delta_db = refb.db - inp.db;
            band_deltas.push(BandDelta {
                center: inp.center,
                delta_db,
            });

            if delta_db.abs() > EQ_SUGGESTION_DB {
                let action = if delta_db > 0.0 {
                    EqAction::Boost
                } else {
                    EqAction::Cut
                };
                let significant = delta_db.abs() > SIGNIFICANT_DB;
                if significant {
                    log::info!(
                        "  {:>7.1} Hz: input {:>5.1} dB | reference {:>5.1} dB -> {:?} {:.1} dB",
                        inp.center,
                        inp.db,
                        refb.db,
                        action,
                        delta_db.abs()
                    );
                }
                eq_suggestions.push(EqSuggestion {
                    frequency: inp.center,
                    adjustment_db: delta_db,
                    action,
                    input_energy: inp.percentage,
                    reference_energy: refb.percentage,
                    significant,
                });
            }
        }

        let lufs_delta = reference.integrated_lufs - input.integrated_lufs;

        let width_delta = reference.stereo_width - input.stereo_width;
        let width_advice = if width_delta.abs() > WIDTH_TOLERANCE {
            if width_delta > 0.0 {
                WidthAdvice::Widen
            } else {
                WidthAdvice::Narrow
            }
        } else {
            WidthAdvice::MatchesWell
        };

        let dynamics_delta = reference.crest_factor_db - input.crest_factor_db;
        let dynamics_advice = if dynamics_delta.abs() > DYNAMICS_TOLERANCE_DB {
            if dynamics_delta > 0.0 {
                DynamicsAdvice::ReduceCompression
            } else {
                DynamicsAdvice::IncreaseCompression
            }
        } else {
            DynamicsAdvice::MatchesWell
        };

        log::info!(
            "Reference: {} EQ moves, gain {:+.1} dB, width {:?}, dynamics {:?}",
            eq_suggestions.len(),
            lufs_delta,
            width_advice,
            dynamics_advice
        );

        ReferenceComparison {
            band_deltas,
            eq_suggestions,
            lufs_delta,
            width_delta,
            width_advice,
            dynamics_delta,
            dynamics_advice,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};

    fn profile(signal: AudioSignal) -> TrackProfile {
        TrackProfile::measure(&signal)
    }

    fn bright_wide() -> TrackProfile {
        let mut left = noise(0.3, 44100, 1);
        for (s, t) in left.iter_mut().zip(sine(5000.0, 0.3, 44100, 1.0)) {
            *s += t;
        }
        profile(AudioSignal::stereo(left, noise(0.3, 44100, 2), 44100).unwrap())
    }

    fn dull_narrow() -> TrackProfile {
        let mut mono = noise(0.05, 44100, 3);
        for (s, t) in mono.iter_mut().zip(sine(120.0, 0.5, 44100, 1.0)) {
            *s += t;
        }
        profile(AudioSignal::stereo(mono.clone(), mono, 44100).unwrap())
    }

    #[test]
    fn swapping_tracks_negates_every_delta() {
        let a = bright_wide();
        let b = dull_narrow();
        let ab = ReferenceMatcher::compare(&a, &b);
        let ba = ReferenceMatcher::compare(&b, &a);

        assert_eq!(ab.band_deltas.len(), 31);
        for (x, y) in ab.band_deltas.iter().zip(&ba.band_deltas) {
            assert_eq!(x.delta_db, -y.delta_db);
        }
        assert_eq!(ab.lufs_delta, -ba.lufs_delta);
        assert_eq!(ab.width_delta, -ba.width_delta);
        assert_eq!(ab.dynamics_delta, -ba.dynamics_delta);

        assert_eq!(ab.eq_suggestions.len(), ba.eq_suggestions.len());
        for (x, y) in ab.eq_suggestions.iter().zip(&ba.eq_suggestions) {
            assert_eq!(x.frequency, y.frequency);
            assert_ne!(x.action, y.action);
        }
    }

    #[test]
    fn judgments_follow_deltas() {
        let cmp = ReferenceMatcher::compare(&dull_narrow(), &bright_wide());
        assert_eq!(cmp.width_advice, WidthAdvice::Widen);
        let band_5k = cmp
            .eq_suggestions
            .iter()
            .find(|s| s.frequency == 5000.0)
            .unwrap();
        assert_eq!(band_5k.action, EqAction::Boost);
        assert!(band_5k.significant);

        let reverse = ReferenceMatcher::compare(&bright_wide(), &dull_narrow());
        assert_eq!(reverse.width_advice, WidthAdvice::Narrow);
    }

    #[test]
    fn identical_tracks_match() {
        let a = bright_wide();
        let cmp = ReferenceMatcher::compare(&a, &a);
        assert!(cmp.eq_suggestions.is_empty());
        assert_eq!(cmp.lufs_delta, 0.0);
        assert_eq!(cmp.width_advice, WidthAdvice::MatchesWell);
        assert_eq!(cmp.dynamics_advice, DynamicsAdvice::MatchesWell);
    }
}
