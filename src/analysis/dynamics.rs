use serde::Serialize;

use crate::audio::signal::{amplitude_to_db, mean_square, peak};

/// Crest factor above which the material is flagged for compression.
const COMPRESSION_CREST_DB: f32 = 12.0;
const CLIP_LEVEL: f32 = 0.99;
/// Share of clipped samples, in percent, that counts as clipping.
const CLIP_PERCENT: f32 = 0.01;

#[derive(Clone, Debug, Serialize)]
pub struct DynamicsProfile {
    pub rms_db: f32,
    pub peak_db: f32,
    pub crest_factor_db: f32,
    /// Excess kurtosis of the sample distribution.
    pub kurtosis: f32,
    pub skewness: f32,
    /// Distance from the peak to -1 dBFS.
    pub headroom_db: f32,
    pub needs_compression: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClippingReport {
    pub clipped_samples: usize,
    pub percentage: f32,
    pub has_clipping: bool,
}

pub struct DynamicsAnalyzer;

impl DynamicsAnalyzer {
    pub fn analyze(samples: &[f32]) -> DynamicsProfile {
        let rms_db = amplitude_to_db(mean_square(samples).sqrt() as f32);
        let peak_db = amplitude_to_db(peak(samples));
        let crest_factor_db = peak_db - rms_db;
        let (skewness, kurtosis) = moments(samples);

        let profile = DynamicsProfile {
            rms_db,
            peak_db,
            crest_factor_db,
            kurtosis,
            skewness,
            headroom_db: -1.0 - peak_db,
            needs_compression: crest_factor_db > COMPRESSION_CREST_DB,
        };
        log::info!(
            "Dynamics: RMS {:.1} dB, peak {:.1} dB, crest {:.1} dB",
            profile.rms_db,
            profile.peak_db,
            profile.crest_factor_db
        );
        profile
    }

    pub fn detect_clipping(samples: &[f32]) -> ClippingReport {
        let clipped_samples = samples.iter().filter(|s| s.abs() >= CLIP_LEVEL).count();
        let percentage = if samples.is_empty() {
            0.0
        } else {
            clipped_samples as f32 / samples.len() as f32 * 100.0
        };
        if clipped_samples > 0 {
            log::warn!("{} clipped samples ({:.3}%)", clipped_samples, percentage);
        }
        ClippingReport {
            clipped_samples,
            percentage,
            has_clipping: percentage > CLIP_PERCENT,
        }
    }
}

/// Population skewness and excess kurtosis. Zero variance yields zeros.
fn moments(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&x| x as f64).sum::<f64>() / n;
    let (mut m2, mut m3, mut m4) = (0.0f64, 0.0f64, 0.0f64);
    for &x in samples {
        let d = x as f64 - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2 <= 0.0 {
        return (0.0, 0.0);
    }
    ((m3 / m2.powf(1.5)) as f32, (m4 / (m2 * m2) - 3.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};
    use approx::assert_abs_diff_eq;

    #[test]
    fn sine_crest_factor_is_3db() {
        let profile = DynamicsAnalyzer::analyze(&sine(1000.0, 0.5, 48000, 1.0));
        assert_abs_diff_eq!(profile.crest_factor_db, 3.0103, epsilon = 0.01);
        assert_abs_diff_eq!(profile.peak_db, -6.0206, epsilon = 0.01);
        assert_abs_diff_eq!(profile.headroom_db, 5.0206, epsilon = 0.01);
        // Arcsine distribution
        assert_abs_diff_eq!(profile.kurtosis, -1.5, epsilon = 0.01);
        assert_abs_diff_eq!(profile.skewness, 0.0, epsilon = 0.01);
        assert!(!profile.needs_compression);
    }

    #[test]
    fn sparse_clicks_need_compression() {
        let mut samples = vec![0.0f32; 48000];
        for i in (0..48000).step_by(4800) {
            samples[i] = 0.9;
        }
        let profile = DynamicsAnalyzer::analyze(&samples);
        assert!(profile.crest_factor_db > 12.0);
        assert!(profile.needs_compression);
        assert!(profile.kurtosis > 100.0);
    }

    #[test]
    fn uniform_noise_kurtosis() {
        let profile = DynamicsAnalyzer::analyze(&noise(0.5, 100_000, 9));
        assert_abs_diff_eq!(profile.kurtosis, -1.2, epsilon = 0.05);
    }

    #[test]
    fn silence_is_all_floor() {
        let profile = DynamicsAnalyzer::analyze(&vec![0.0; 1000]);
        assert_eq!(profile.rms_db, -80.0);
        assert_eq!(profile.peak_db, -80.0);
        assert_eq!(profile.crest_factor_db, 0.0);
        assert_eq!(profile.kurtosis, 0.0);
    }

    #[test]
    fn quiet_impulse_keeps_true_crest() {
        let mut samples = vec![0.0f32; 100_000];
        samples[50_000] = 1e-3;
        let profile = DynamicsAnalyzer::analyze(&samples);
        // RMS = 1e-3 / sqrt(1e5), about -110 dB
        assert_abs_diff_eq!(profile.rms_db, -110.0, epsilon = 0.01);
        assert_abs_diff_eq!(profile.peak_db, -60.0, epsilon = 0.01);
        assert_abs_diff_eq!(profile.crest_factor_db, 50.0, epsilon = 0.02);
        assert!(profile.needs_compression);
    }

    #[test]
    fn clipping_threshold() {
        let mut samples = vec![0.1f32; 20_000];
        samples[0] = 1.0;
        assert!(!DynamicsAnalyzer::detect_clipping(&samples).has_clipping);
        samples[1] = -0.995;
        samples[2] = 0.99;
        let report = DynamicsAnalyzer::detect_clipping(&samples);
        assert_eq!(report.clipped_samples, 3);
        assert!(report.has_clipping);
    }
}
