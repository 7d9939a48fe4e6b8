use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use super::fft::hann_window;

const ONSET_FFT_SIZE: usize = 1024;
const ONSET_HOP_SIZE: usize = 256;

/// Default number of onsets measured.
pub const MAX_TRANSIENTS: usize = 50;
const WINDOW_SAMPLES: usize = 1000;
const STRENGTH_SAMPLES: usize = 200;
const LEAD_IN_SAMPLES: usize = 100;

/// Source of onset times, in seconds, in ascending order.
pub trait OnsetDetector {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<f32>;
}

/// Spectral-flux onset picking with an adaptive local-mean threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpectralFluxOnsets;

impl OnsetDetector for SpectralFluxOnsets {
    fn detect(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(ONSET_FFT_SIZE);
        let hann = hann_window(ONSET_FFT_SIZE);

        let mut prev_magnitudes = vec![0.0f32; ONSET_FFT_SIZE / 2];
        let mut flux_values: Vec<(f32, f32)> = Vec::new(); // (time, flux)

        let mut pos = 0;
        while pos + ONSET_FFT_SIZE <= samples.len() {
            let mut buffer: Vec<Complex<f32>> = samples[pos..pos + ONSET_FFT_SIZE]
                .iter()
                .enumerate()
                .map(|(i, &s)| Complex::new(s * hann[i], 0.0))
                .collect();
            fft.process(&mut buffer);

            let magnitudes: Vec<f32> = buffer[..ONSET_FFT_SIZE / 2].iter().map(|c| c.norm()).collect();

            let flux: f32 = magnitudes
                .iter()
                .zip(prev_magnitudes.iter())
                .map(|(cur, prev)| (cur - prev).max(0.0))
                .sum();

            // Stamp the frame at its center
            let time = (pos + ONSET_FFT_SIZE / 2) as f32 / sample_rate as f32;
            flux_values.push((time, flux));
            prev_magnitudes = magnitudes;
            pos += ONSET_HOP_SIZE;
        }

        pick_onsets(&flux_values)
    }
}

fn pick_onsets(flux_values: &[(f32, f32)]) -> Vec<f32> {
    if flux_values.is_empty() {
        return Vec::new();
    }

    let window = 20;
    let mut onset_times = Vec::new();

    for i in 0..flux_values.len() {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(flux_values.len());
        let local_mean: f32 = flux_values[start..end].iter().map(|(_, f)| f).sum::<f32>()
            / (end - start) as f32;

        let threshold = local_mean * 1.5 + 0.01;

        if flux_values[i].1 > threshold {
            let is_peak = (i == 0 || flux_values[i].1 >= flux_values[i - 1].1)
                && (i == flux_values.len() - 1 || flux_values[i].1 >= flux_values[i + 1].1);

            // Minimum gap between onsets (100ms)
            let far_enough = onset_times
                .last()
                .map_or(true, |&last: &f32| flux_values[i].0 - last > 0.1);

            if is_peak && far_enough {
                onset_times.push(flux_values[i].0);
            }
        }
    }

    onset_times
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientCharacter {
    /// Attack under 5 ms.
    VeryPunchy,
    /// 5-10 ms.
    Punchy,
    /// 10-20 ms.
    Smooth,
    /// 20 ms or slower.
    VerySmooth,
    /// No measurable transients.
    Undetermined,
}

impl TransientCharacter {
    fn from_attack_ms(attack_ms: f32) -> Self {
        if attack_ms < 5.0 {
            Self::VeryPunchy
        } else if attack_ms < 10.0 {
            Self::Punchy
        } else if attack_ms < 20.0 {
            Self::Smooth
        } else {
            Self::VerySmooth
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TransientProfile {
    /// All onsets reported by the detector, including ones not measured.
    pub count: usize,
    pub avg_strength: f32,
    pub avg_attack_ms: f32,
    /// `1 - std/mean` of the measured strengths.
    pub consistency: f32,
    pub character: TransientCharacter,
}

impl TransientProfile {
    fn empty(count: usize) -> Self {
        Self {
            count,
            avg_strength: 0.0,
            avg_attack_ms: 0.0,
            consistency: 0.0,
            character: TransientCharacter::Undetermined,
        }
    }
}

pub struct TransientAnalyzer<'a> {
    onsets: &'a dyn OnsetDetector,
    limit: usize,
}

impl<'a> TransientAnalyzer<'a> {
    pub fn new(onsets: &'a dyn OnsetDetector) -> Self {
        Self {
            onsets,
            limit: MAX_TRANSIENTS,
        }
    }

    /// Measure at most `limit` onsets; the rest only count.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn analyze(&self, samples: &[f32], sample_rate: u32) -> TransientProfile {
        let onset_times = self.onsets.detect(samples, sample_rate);

        let mut strengths = Vec::new();
        let mut attack_times = Vec::new();

        for &onset_time in onset_times.iter().take(self.limit) {
            let onset = (onset_time * sample_rate as f32) as usize;
            if onset < LEAD_IN_SAMPLES || onset + WINDOW_SAMPLES > samples.len() {
                continue;
            }
            let window = &samples[onset..onset + WINDOW_SAMPLES];

            let strength = window[..STRENGTH_SAMPLES]
                .iter()
                .map(|s| s.abs())
                .fold(0.0f32, f32::max);
            let peak = window.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
            let threshold = peak * 0.9;
            let attack_sample = window.iter().position(|s| s.abs() >= threshold).unwrap_or(0);

            strengths.push(strength);
            attack_times.push(attack_sample as f32 / sample_rate as f32 * 1000.0);
        }

        if strengths.is_empty() {
            log::debug!("No measurable transients ({} onsets)", onset_times.len());
            return TransientProfile::empty(onset_times.len());
        }

        let n = strengths.len() as f32;
        let avg_strength = strengths.iter().sum::<f32>() / n;
        let avg_attack_ms = attack_times.iter().sum::<f32>() / n;
        let variance = strengths
            .iter()
            .map(|s| (s - avg_strength).powi(2))
            .sum::<f32>()
            / n;
        let consistency = 1.0 - variance.sqrt() / (avg_strength + 1e-10);
        let character = TransientCharacter::from_attack_ms(avg_attack_ms);

        log::info!(
            "Transients: {} onsets, strength {:.3}, attack {:.2} ms, consistency {:.2}, {:?}",
            onset_times.len(),
            avg_strength,
            avg_attack_ms,
            consistency,
            character
        );

        TransientProfile {
            count: onset_times.len(),
            avg_strength,
            avg_attack_ms,
            consistency,
            character,
        }
    }
}
