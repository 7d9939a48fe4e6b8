//! Band-energy measurement at two resolutions: the ISO 31-band third-octave
//! scan used for reporting and reference matching, and the 6-band quick scan
//! that drives frequency-balance issue detection.

use serde::Serialize;

use super::fft::{average_magnitude, bin_frequencies};
use crate::audio::signal::amplitude_to_db;

/// FFT size for the 31-band third-octave pass.
pub const THIRD_OCTAVE_FFT_SIZE: usize = 4096;
/// FFT size for the 6-band quick scan.
pub const QUICK_FFT_SIZE: usize = 2048;

/// ISO 266 third-octave center frequencies, 20 Hz to 20 kHz.
pub const ISO_CENTERS: [f32; 31] = [
    20.0, 25.0, 31.5, 40.0, 50.0, 63.0, 80.0, 100.0, 125.0, 160.0, 200.0, 250.0, 315.0, 400.0,
    500.0, 630.0, 800.0, 1000.0, 1250.0, 1600.0, 2000.0, 2500.0, 3150.0, 4000.0, 5000.0, 6300.0,
    8000.0, 10000.0, 12500.0, 16000.0, 20000.0,
];

/// Fixed edges of the quick scan, in order: sub-bass, bass, low-mid, mid, high-mid, high.
pub const QUICK_EDGES: [(f32, f32); 6] = [
    (20.0, 60.0),
    (60.0, 250.0),
    (250.0, 500.0),
    (500.0, 2000.0),
    (2000.0, 6000.0),
    (6000.0, 20000.0),
];

const IDEAL_DISTRIBUTION: BandFractions = BandFractions {
    sub_bass: 0.10,
    bass: 0.20,
    low_mid: 0.15,
    mid: 0.25,
    high_mid: 0.20,
    high: 0.10,
};

#[derive(Clone, Debug, Serialize)]
pub struct FrequencyBand {
    pub center: f32,
    pub lower: f32,
    pub upper: f32,
    /// Mean bin magnitude inside the band.
    pub energy: f32,
    pub db: f32,
    /// Share of the summed energy of all bands, 0-100.
    pub percentage: f32,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Spectrum {
    pub bands: Vec<FrequencyBand>,
}

impl Spectrum {
    pub fn total_energy(&self) -> f32 {
        self.bands.iter().map(|b| b.energy).sum()
    }

    pub fn band_at(&self, center: f32) -> Option<&FrequencyBand> {
        self.bands.iter().find(|b| (b.center - center).abs() < 1e-3)
    }
}

/// Energy shares of the six quick-scan bands (each 0-1).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BandFractions {
    pub sub_bass: f32,
    pub bass: f32,
    pub low_mid: f32,
    pub mid: f32,
    pub high_mid: f32,
    pub high: f32,
}

impl BandFractions {
    fn as_array(&self) -> [f32; 6] {
        [
            self.sub_bass,
            self.bass,
            self.low_mid,
            self.mid,
            self.high_mid,
            self.high,
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceIssue {
    MuddyLowMids,
    HarshHighs,
    WeakBass,
    LacksAir,
}

#[derive(Clone, Debug, Serialize)]
pub struct FrequencyBalance {
    pub spectrum: Spectrum,
    pub fractions: BandFractions,
    /// 1.0 means the energy distribution matches the ideal curve exactly.
    pub balance_score: f32,
    pub issues: Vec<BalanceIssue>,
}

impl FrequencyBalance {
    pub fn has_issue(&self, issue: BalanceIssue) -> bool {
        self.issues.contains(&issue)
    }
}

pub struct SpectralAnalyzer;

impl SpectralAnalyzer {
    /// 31-band ISO third-octave analysis of a mono signal.
    pub fn third_octave(samples: &[f32], sample_rate: u32) -> Spectrum {
        let edges: Vec<(f32, f32, f32)> = ISO_CENTERS
            .iter()
            .map(|&c| {
                let half = 2f32.powf(1.0 / 6.0);
                (c, c / half, c * half)
            })
            .collect();
        measure_bands(samples, sample_rate, THIRD_OCTAVE_FFT_SIZE, &edges)
    }

    /// 6-band quick scan with balance score and issue flags.
    pub fn quick_scan(samples: &[f32], sample_rate: u32) -> FrequencyBalance {
        let edges: Vec<(f32, f32, f32)> = QUICK_EDGES
            .iter()
            .map(|&(lo, hi)| ((lo * hi).sqrt(), lo, hi))
            .collect();
        let spectrum = measure_bands(samples, sample_rate, QUICK_FFT_SIZE, &edges);

        let f: Vec<f32> = spectrum.bands.iter().map(|b| b.percentage / 100.0).collect();
        let fractions = BandFractions {
            sub_bass: f[0],
            bass: f[1],
            low_mid: f[2],
            mid: f[3],
            high_mid: f[4],
            high: f[5],
        };

        let deviation: f32 = fractions
            .as_array()
            .iter()
            .zip(IDEAL_DISTRIBUTION.as_array().iter())
            .map(|(e, ideal)| (e - ideal).abs())
            .sum();
        let balance_score = 1.0 - deviation / 2.0;

        let mut issues = Vec::new();
        if spectrum.total_energy() > 0.0 {
            if fractions.low_mid > 0.20 {
                issues.push(BalanceIssue::MuddyLowMids);
            }
            if fractions.high_mid > 0.25 {
                issues.push(BalanceIssue::HarshHighs);
            }
            if fractions.bass < 0.15 {
                issues.push(BalanceIssue::WeakBass);
            }
            if fractions.high < 0.05 {
                issues.push(BalanceIssue::LacksAir);
            }
        }

        log::debug!(
            "Quick scan: balance={:.2}, issues={:?}",
            balance_score,
            issues
        );

        FrequencyBalance {
            spectrum,
            fractions,
            balance_score,
            issues,
        }
    }
}

/// Assign every FFT bin to the band whose `[lower, upper)` range holds its
/// frequency and average the bin magnitudes per band.
fn measure_bands(
    samples: &[f32],
    sample_rate: u32,
    fft_size: usize,
    edges: &[(f32, f32, f32)],
) -> Spectrum {
    let magnitudes = average_magnitude(samples, fft_size);
    let freqs = bin_frequencies(sample_rate, fft_size);

    let mut bands: Vec<FrequencyBand> = edges
        .iter()
        .map(|&(center, lower, upper)| {
            let (sum, count) = freqs
                .iter()
                .zip(magnitudes.iter())
                .filter(|(&f, _)| f >= lower && f < upper)
                .fold((0.0f64, 0usize), |(s, n), (_, &m)| (s + m as f64, n + 1));
            let energy = if count > 0 {
                (sum / count as f64) as f32
            } else {
                0.0
            };
            FrequencyBand {
                center,
                lower,
                upper,
                energy,
                db: amplitude_to_db(energy),
                percentage: 0.0,
            }
        })
        .collect();

    let total: f64 = bands.iter().map(|b| b.energy as f64).sum();
    if total > 0.0 {
        for band in &mut bands {
            band.percentage = (band.energy as f64 / total * 100.0) as f32;
        }
    }

    Spectrum { bands }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};
    use proptest::prelude::*;

    #[test]
    fn third_octave_has_31_ordered_bands() {
        let spectrum = SpectralAnalyzer::third_octave(&noise(0.3, 44100, 7), 44100);
        assert_eq!(spectrum.bands.len(), 31);
        for band in &spectrum.bands {
            assert!(band.lower < band.center && band.center < band.upper);
        }
        for pair in spectrum.bands.windows(2) {
            assert!(pair[0].upper < pair[1].upper);
        }
    }

    #[test]
    fn empty_bands_report_floor() {
        // At 8 kHz the 16 kHz and 20 kHz bands lie above Nyquist
        let spectrum = SpectralAnalyzer::third_octave(&noise(0.3, 8000, 3), 8000);
        let top = spectrum.band_at(20000.0).unwrap();
        assert_eq!(top.energy, 0.0);
        assert_eq!(top.db, -80.0);
    }

    #[test]
    fn silence_has_zero_percentages() {
        let spectrum = SpectralAnalyzer::third_octave(&vec![0.0; 8192], 44100);
        assert!(spectrum.bands.iter().all(|b| b.percentage == 0.0));
        let balance = SpectralAnalyzer::quick_scan(&vec![0.0; 8192], 44100);
        assert!(balance.issues.is_empty());
    }

    #[test]
    fn low_mid_tone_is_flagged_muddy() {
        let balance = SpectralAnalyzer::quick_scan(&sine(350.0, 0.5, 44100, 1.0), 44100);
        assert!(balance.has_issue(BalanceIssue::MuddyLowMids));
        assert!(balance.fractions.low_mid > 0.5);
        assert!(balance.balance_score < 0.7);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn percentages_sum_to_hundred(amplitude in 0.001f32..1.0, seed in 1u64..10_000) {
            let samples = noise(amplitude, 8192, seed);
            let spectrum = SpectralAnalyzer::third_octave(&samples, 44100);
            let sum: f32 = spectrum.bands.iter().map(|b| b.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 0.01);

            let quick = SpectralAnalyzer::quick_scan(&samples, 44100);
            let sum: f32 = quick.spectrum.bands.iter().map(|b| b.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 0.01);
        }
    }
}
