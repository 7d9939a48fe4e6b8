use serde::Serialize;

use super::fft::{average_magnitude, bin_frequencies};

const FFT_SIZE: usize = 4096;
const FUNDAMENTAL_BAND: (f32, f32) = (80.0, 400.0);
const HARMONIC_BAND: (f32, f32) = (400.0, 4000.0);
/// Scales the harmonic/fundamental energy ratio into a THD estimate.
const THD_SCALE: f32 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicCharacter {
    VeryClean,
    CleanWithWarmth,
    WarmAnalog,
    Saturated,
    /// No tonal content to measure.
    Unknown,
}

impl HarmonicCharacter {
    fn from_thd(thd: f32) -> Self {
        if thd < 0.01 {
            Self::VeryClean
        } else if thd < 0.05 {
            Self::CleanWithWarmth
        } else if thd < 0.15 {
            Self::WarmAnalog
        } else {
            Self::Saturated
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct HarmonicProfile {
    /// Estimated total harmonic distortion, 0-1.
    pub thd: f32,
    pub harmonic_ratio: f32,
    pub character: HarmonicCharacter,
}

pub struct HarmonicAnalyzer;

impl HarmonicAnalyzer {
    pub fn analyze(samples: &[f32], sample_rate: u32) -> HarmonicProfile {
        let spectrum = average_magnitude(samples, FFT_SIZE);
        let freqs = bin_frequencies(sample_rate, FFT_SIZE);

        let band_sum = |(lo, hi): (f32, f32)| -> f64 {
            freqs
                .iter()
                .zip(spectrum.iter())
                .filter(|(&f, _)| f >= lo && f < hi)
                .map(|(_, &m)| m as f64)
                .sum()
        };
        let fundamental = band_sum(FUNDAMENTAL_BAND);
        let harmonic = band_sum(HARMONIC_BAND);

        if fundamental + harmonic <= 0.0 {
            log::debug!("Harmonic analysis: no tonal content");
            return HarmonicProfile {
                thd: 0.0,
                harmonic_ratio: 0.0,
                character: HarmonicCharacter::Unknown,
            };
        }

        let harmonic_ratio = if fundamental > 0.0 {
            (harmonic / fundamental) as f32
        } else {
            0.0
        };
        let thd = (harmonic_ratio * THD_SCALE).min(1.0);
        let character = HarmonicCharacter::from_thd(thd);

        log::info!("THD estimate: {:.2}% ({:?})", thd * 100.0, character);

        HarmonicProfile {
            thd,
            harmonic_ratio,
            character,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::sine;

    #[test]
    fn overtones_raise_thd() {
        let sr = 44100;
        let clean = sine(200.0, 0.5, sr, 1.0);
        let mut rich = clean.clone();
        for (k, amp) in [(3.0, 0.3), (5.0, 0.2), (9.0, 0.15)] {
            for (s, h) in rich.iter_mut().zip(sine(200.0 * k, amp, sr, 1.0)) {
                *s += h;
            }
        }

        let clean = HarmonicAnalyzer::analyze(&clean, sr);
        let rich = HarmonicAnalyzer::analyze(&rich, sr);
        assert!(rich.thd > clean.thd);
        assert!(rich.harmonic_ratio > 0.5);
        assert_ne!(rich.character, HarmonicCharacter::VeryClean);
    }

    #[test]
    fn thd_is_capped() {
        // Everything in the harmonic band, nothing in the fundamental band
        let profile = HarmonicAnalyzer::analyze(&sine(2000.0, 0.5, 44100, 1.0), 44100);
        assert!(profile.thd <= 1.0);
    }

    #[test]
    fn silence_is_unknown() {
        let profile = HarmonicAnalyzer::analyze(&vec![0.0; 8192], 44100);
        assert_eq!(profile.thd, 0.0);
        assert_eq!(profile.character, HarmonicCharacter::Unknown);
    }

    #[test]
    fn character_buckets() {
        assert_eq!(HarmonicCharacter::from_thd(0.005), HarmonicCharacter::VeryClean);
        assert_eq!(HarmonicCharacter::from_thd(0.02), HarmonicCharacter::CleanWithWarmth);
        assert_eq!(HarmonicCharacter::from_thd(0.1), HarmonicCharacter::WarmAnalog);
        assert_eq!(HarmonicCharacter::from_thd(0.5), HarmonicCharacter::Saturated);
    }
}
