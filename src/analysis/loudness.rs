//! Simplified K-weighted loudness: two first-order high-pass stages, mean
//! square energy and `-0.691 + 10·log10(ms)`. There is no absolute or
//! relative gating, so values differ from a compliant BS.1770 meter on
//! material with long quiet passages. Platform targets are tuned to this
//! formula; keep it as is.

use serde::Serialize;

use crate::audio::signal::{mean_square, SILENCE_DB};
use crate::biquad::{filter_in_place, BiquadCoeffs};

/// Corner of the high-frequency weighting stage.
const SHELF_HZ: f64 = 1680.0;
/// Rumble cutoff of the low-frequency stage.
const RUMBLE_HZ: f64 = 38.0;
const SHORT_TERM_SECONDS: f32 = 3.0;

#[derive(Clone, Debug, Serialize)]
pub struct LoudnessMeasurement {
    pub integrated_lufs: f32,
    /// Time-ordered LUFS of overlapping 3 s windows at 50 % hop.
    pub short_term_lufs: Vec<f32>,
    /// Mean of the short-term series; equals the integrated value when the
    /// input is shorter than one window.
    pub short_term_mean_lufs: f32,
    /// 95th minus 10th percentile of the short-term series, in LU.
    pub loudness_range: f32,
}

pub struct LoudnessMeter;

impl LoudnessMeter {
    pub fn measure(samples: &[f32], sample_rate: u32) -> LoudnessMeasurement {
        let weighted = k_weight(samples, sample_rate);
        let integrated_lufs = ms_to_lufs(mean_square(&weighted));

        let window = (SHORT_TERM_SECONDS * sample_rate as f32) as usize;
        let hop = (window / 2).max(1);
        let mut short_term_lufs = Vec::new();
        let mut start = 0usize;
        while window > 0 && start + window < weighted.len() {
            let ms = mean_square(&weighted[start..start + window]);
            if ms > 0.0 {
                short_term_lufs.push(ms_to_lufs(ms));
            }
            start += hop;
        }

        let (short_term_mean_lufs, loudness_range) = if short_term_lufs.is_empty() {
            (integrated_lufs, 0.0)
        } else {
            let mean = short_term_lufs.iter().sum::<f32>() / short_term_lufs.len() as f32;
            let lra = percentile(&short_term_lufs, 95.0) - percentile(&short_term_lufs, 10.0);
            (mean, lra)
        };

        log::debug!(
            "Loudness: integrated={:.2} LUFS, {} short-term windows, LRA={:.2} LU",
            integrated_lufs,
            short_term_lufs.len(),
            loudness_range
        );

        LoudnessMeasurement {
            integrated_lufs,
            short_term_lufs,
            short_term_mean_lufs,
            loudness_range,
        }
    }
}

fn k_weight(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f64;
    let mut out = samples.to_vec();
    filter_in_place(
        &[
            BiquadCoeffs::first_order_highpass(SHELF_HZ, sr),
            BiquadCoeffs::first_order_highpass(RUMBLE_HZ, sr),
        ],
        &mut out,
    );
    out
}

fn ms_to_lufs(ms: f64) -> f32 {
    if ms > 0.0 {
        ((-0.691 + 10.0 * ms.log10()) as f32).max(SILENCE_DB)
    } else {
        SILENCE_DB
    }
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f32], pct: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = pct / 100.0 * (sorted.len() - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};
    use approx::assert_abs_diff_eq;

    fn first_order_gain(freq: f64, corner: f64, sr: f64) -> f64 {
        let t = (std::f64::consts::PI * freq / sr).tan();
        let k = (std::f64::consts::PI * corner / sr).tan();
        t / (t * t + k * k).sqrt()
    }

    #[test]
    fn calibration_tone_matches_formula() {
        let sr = 48000;
        let amplitude = 0.5f64;
        let m = LoudnessMeter::measure(&sine(1000.0, amplitude as f32, sr, 10.0), sr);

        let gain = first_order_gain(1000.0, SHELF_HZ, sr as f64)
            * first_order_gain(1000.0, RUMBLE_HZ, sr as f64);
        let ms = amplitude * amplitude / 2.0 * gain * gain;
        let expected = -0.691 + 10.0 * ms.log10();
        assert_abs_diff_eq!(m.integrated_lufs as f64, expected, epsilon = 0.01);

        // 10 s at 3 s windows, 1.5 s hop
        assert_eq!(m.short_term_lufs.len(), 5);
        assert!(m.loudness_range < 0.01);
        assert_abs_diff_eq!(m.short_term_mean_lufs, m.integrated_lufs, epsilon = 0.05);
    }

    #[test]
    fn silence_floors_at_minus_80() {
        let m = LoudnessMeter::measure(&vec![0.0; 48000 * 4], 48000);
        assert_eq!(m.integrated_lufs, -80.0);
        assert!(m.short_term_lufs.is_empty());
        assert_eq!(m.loudness_range, 0.0);
    }

    #[test]
    fn range_reflects_level_changes() {
        let sr = 16000;
        let mut samples = noise(0.02, sr as usize * 6, 11);
        samples.extend(noise(0.4, sr as usize * 6, 12));
        let m = LoudnessMeter::measure(&samples, sr);
        assert!(m.loudness_range > 20.0);
        for pair in m.short_term_lufs.windows(2) {
            assert!(pair[1] >= pair[0] - 1.0);
        }
    }

    #[test]
    fn percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        assert_abs_diff_eq!(percentile(&v, 10.0), 1.4, epsilon = 1e-6);
        assert_abs_diff_eq!(percentile(&v, 95.0), 4.8, epsilon = 1e-6);
    }
}
