use serde::Serialize;

use super::fft::{average_db, bin_frequencies};

const FFT_SIZE: usize = 8192;
/// Width of the Gaussian kernel used to estimate the spectral baseline, in bins.
const BASELINE_SIGMA: f32 = 20.0;
/// Bins skipped at both ends of the spectrum.
const EDGE_BINS: usize = 50;
const MIN_FREQ: f32 = 50.0;
const MAX_FREQ: f32 = 16000.0;
const MIN_PEAK_DB: f32 = 6.0;
const MIN_Q: f32 = 2.0;
const MAX_CUT_DB: f32 = 12.0;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resonance {
    pub frequency: f32,
    /// Height above the smoothed baseline, in dB.
    pub peak_db: f32,
    pub q_factor: f32,
    pub suggested_cut_db: f32,
}

pub struct ResonanceDetector;

impl ResonanceDetector {
    /// Narrow spectral peaks, most severe first.
    pub fn detect(samples: &[f32], sample_rate: u32) -> Vec<Resonance> {
        let spectrum = average_db(samples, FFT_SIZE);
        let freqs = bin_frequencies(sample_rate, FFT_SIZE);
        find_resonances(&spectrum, &freqs)
    }

    /// Log the `limit` most severe resonances.
    pub fn log_summary(resonances: &[Resonance], limit: usize) {
        if resonances.is_empty() {
            log::info!("No significant resonances detected");
            return;
        }
        log::info!("Found {} resonances", resonances.len());
        for r in resonances.iter().take(limit) {
            log::info!(
                "  {:>7.1} Hz: peak {:>4.1} dB (Q={:.1}) -> cut {:.1} dB",
                r.frequency,
                r.peak_db,
                r.q_factor,
                r.suggested_cut_db
            );
        }
    }
}

fn find_resonances(spectrum: &[f32], freqs: &[f32]) -> Vec<Resonance> {
    let n = spectrum.len();
    if n <= 2 * EDGE_BINS {
        return Vec::new();
    }
    let baseline = gaussian_smooth(spectrum, BASELINE_SIGMA);
    let mut resonances = Vec::new();

    for i in EDGE_BINS..n - EDGE_BINS {
        let freq = freqs[i];
        if !(MIN_FREQ..=MAX_FREQ).contains(&freq) {
            continue;
        }
        let is_local_max = spectrum[i] >= spectrum[i - 1] && spectrum[i] > spectrum[i + 1];
        let peak_db = spectrum[i] - baseline[i];
        if !is_local_max || peak_db <= MIN_PEAK_DB {
            continue;
        }

        // Walk out to the half-power points
        let half_power = spectrum[i] - 3.0;
        let mut lower = i;
        while lower > 0 && spectrum[lower] > half_power {
            lower -= 1;
        }
        let mut upper = i;
        while upper < n - 1 && spectrum[upper] > half_power {
            upper += 1;
        }

        let bandwidth = freqs[upper] - freqs[lower];
        let q_factor = if bandwidth > 0.0 { freq / bandwidth } else { 0.0 };
        if q_factor > MIN_Q {
            resonances.push(Resonance {
                frequency: freq,
                peak_db,
                q_factor,
                suggested_cut_db: (peak_db * 0.7).min(MAX_CUT_DB),
            });
        }
    }

    resonances.sort_by(|a, b| b.peak_db.total_cmp(&a.peak_db));
    resonances
}

/// Gaussian filter with mirrored edges and a kernel truncated at 4 sigma.
fn gaussian_smooth(values: &[f32], sigma: f32) -> Vec<f32> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let kernel: Vec<f32> = (-radius..=radius)
        .map(|k| (-0.5 * (k as f32 / sigma).powi(2)).exp())
        .collect();
    let norm: f32 = kernel.iter().sum();
    let n = values.len() as isize;

    let reflect = |mut idx: isize| -> usize {
        // Repeat mirroring for kernels longer than the signal
        loop {
            if idx < 0 {
                idx = -idx - 1;
            } else if idx >= n {
                idx = 2 * n - idx - 1;
            } else {
                return idx as usize;
            }
        }
    };

    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .map(|(j, &w)| w * values[reflect(i + j as isize - radius)])
                .sum::<f32>()
                / norm
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::{noise, sine};

    fn tone_in_noise(amplitude: f32) -> Vec<f32> {
        let sr = 44100;
        let seconds = 5.0;
        let mut samples = noise(0.1732, (sr as f32 * seconds) as usize, 42);
        for (s, t) in samples.iter_mut().zip(sine(3000.0, amplitude, sr, seconds)) {
            *s += t;
        }
        samples
    }

    #[test]
    fn finds_single_tone_in_noise() {
        // About 12 dB above the smoothed baseline
        let resonances = ResonanceDetector::detect(&tone_in_noise(0.009), 44100);
        assert_eq!(resonances.len(), 1, "{:?}", resonances);
        let r = &resonances[0];
        assert!((r.frequency - 3000.0).abs() < 10.0);
        assert!(r.q_factor > 2.0);
        assert!((r.peak_db - 12.0).abs() < 0.7, "peak {}", r.peak_db);
        assert!((r.suggested_cut_db - 8.4).abs() < 0.5, "cut {}", r.suggested_cut_db);
        assert!((r.suggested_cut_db - r.peak_db * 0.7).abs() < 1e-4);
    }

    #[test]
    fn loud_tone_cut_is_capped() {
        let resonances = ResonanceDetector::detect(&tone_in_noise(0.1), 44100);
        assert_eq!(resonances.len(), 1, "{:?}", resonances);
        let r = &resonances[0];
        assert!(r.peak_db > 20.0, "peak {}", r.peak_db);
        assert_eq!(r.suggested_cut_db, 12.0);
    }

    #[test]
    fn cut_is_capped_at_12_db() {
        let mut spectrum = vec![-60.0f32; 1000];
        spectrum[500] = -20.0;
        let freqs: Vec<f32> = (0..1000).map(|i| i as f32 * 10.0).collect();
        let found = find_resonances(&spectrum, &freqs);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].frequency, 5000.0);
        assert_eq!(found[0].suggested_cut_db, 12.0);
    }

    #[test]
    fn silence_has_no_resonances() {
        assert!(ResonanceDetector::detect(&vec![0.0; 44100], 44100).is_empty());
    }

    #[test]
    fn smoothing_preserves_constant() {
        let smoothed = gaussian_smooth(&[3.0; 40], 20.0);
        assert!(smoothed.iter().all(|&v| (v - 3.0).abs() < 1e-4));
    }
}
