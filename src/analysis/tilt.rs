use serde::Serialize;

use super::fft::{average_magnitude, bin_frequencies, magnitude_to_db_relative};

const FFT_SIZE: usize = 4096;
const MIN_FREQ: f32 = 20.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TiltCharacter {
    VeryBright,
    Bright,
    Warm,
    Dark,
    /// Silent input.
    Undetermined,
}

impl TiltCharacter {
    fn from_slope(slope: f32) -> Self {
        if slope > 2.0 {
            Self::VeryBright
        } else if slope > 0.0 {
            Self::Bright
        } else if slope > -3.0 {
            Self::Warm
        } else {
            Self::Dark
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SpectralTilt {
    pub db_per_decade: f32,
    pub character: TiltCharacter,
}

pub struct SpectralTiltAnalyzer;

impl SpectralTiltAnalyzer {
    pub fn analyze(samples: &[f32], sample_rate: u32) -> SpectralTilt {
        let magnitudes = average_magnitude(samples, FFT_SIZE);
        if magnitudes.iter().all(|&m| m == 0.0) {
            return SpectralTilt {
                db_per_decade: 0.0,
                character: TiltCharacter::Undetermined,
            };
        }

        let db = magnitude_to_db_relative(&magnitudes);
        let freqs = bin_frequencies(sample_rate, FFT_SIZE);
        let points: Vec<(f64, f64)> = freqs
            .iter()
            .zip(db.iter())
            .filter(|(&f, _)| f > MIN_FREQ)
            .map(|(&f, &d)| ((f as f64).log10(), d as f64))
            .collect();

        let db_per_decade = linear_slope(&points) as f32;
        let character = TiltCharacter::from_slope(db_per_decade);
        log::info!("Spectral tilt: {:.2} dB/decade ({:?})", db_per_decade, character);

        SpectralTilt {
            db_per_decade,
            character,
        }
    }
}

/// Least-squares slope of `y` against `x`.
fn linear_slope(points: &[(f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let (num, den) = points.iter().fold((0.0, 0.0), |(num, den), &(x, y)| {
        (num + (x - mean_x) * (y - mean_y), den + (x - mean_x).powi(2))
    });
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::noise;
    use crate::biquad::{butterworth, filtered, PassType};

    #[test]
    fn slope_of_exact_line() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 3.0 - 2.0 * i as f64)).collect();
        assert!((linear_slope(&points) + 2.0).abs() < 1e-12);
    }

    #[test]
    fn lowpassed_noise_is_darker_than_white() {
        let sr = 44100;
        let white = noise(0.5, sr as usize, 5);
        let dark = filtered(&butterworth(PassType::Lowpass, 4, 500.0, sr as f64), &white);

        let white_tilt = SpectralTiltAnalyzer::analyze(&white, sr);
        let dark_tilt = SpectralTiltAnalyzer::analyze(&dark, sr);
        assert!(white_tilt.db_per_decade.abs() < 2.0, "{}", white_tilt.db_per_decade);
        assert!(dark_tilt.db_per_decade < -3.0);
        assert_eq!(dark_tilt.character, TiltCharacter::Dark);
    }

    #[test]
    fn silence_is_undetermined() {
        let tilt = SpectralTiltAnalyzer::analyze(&vec![0.0; 8192], 44100);
        assert_eq!(tilt.db_per_decade, 0.0);
        assert_eq!(tilt.character, TiltCharacter::Undetermined);
    }
}
