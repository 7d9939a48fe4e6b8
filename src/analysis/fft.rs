use rustfft::{num_complex::Complex, FftPlanner};

/// Dynamic range kept when converting magnitudes to dB relative to the peak.
const TOP_DB: f32 = 80.0;
const AMIN: f32 = 1e-5;

pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}

/// Center frequency of every non-negative FFT bin.
pub fn bin_frequencies(sample_rate: u32, fft_size: usize) -> Vec<f32> {
    let resolution = sample_rate as f32 / fft_size as f32;
    (0..=fft_size / 2).map(|k| k as f32 * resolution).collect()
}

/// Centered, zero-padded STFT with a Hann window and hop of `fft_size / 4`.
/// Calls `f` with the magnitude of bins `0..=fft_size/2` for every frame.
fn for_each_frame(samples: &[f32], fft_size: usize, mut f: impl FnMut(&[f32])) {
    if samples.is_empty() {
        return;
    }
    let hop = fft_size / 4;
    let pad = fft_size / 2;
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let hann = hann_window(fft_size);
    let num_frames = 1 + samples.len() / hop;

    let mut buffer = vec![Complex::new(0.0f32, 0.0); fft_size];
    let mut magnitudes = vec![0.0f32; fft_size / 2 + 1];

    for frame in 0..num_frames {
        // Padded-signal index `frame * hop + i` maps to sample `frame * hop + i - pad`
        let origin = (frame * hop) as isize - pad as isize;
        for (i, slot) in buffer.iter_mut().enumerate() {
            let idx = origin + i as isize;
            let s = if idx >= 0 && (idx as usize) < samples.len() {
                samples[idx as usize]
            } else {
                0.0
            };
            *slot = Complex::new(s * hann[i], 0.0);
        }
        fft.process(&mut buffer);
        for (m, c) in magnitudes.iter_mut().zip(buffer.iter()) {
            *m = c.norm();
        }
        f(&magnitudes);
    }
}

/// Per-bin magnitude averaged over all frames.
pub fn average_magnitude(samples: &[f32], fft_size: usize) -> Vec<f32> {
    let bins = fft_size / 2 + 1;
    let mut sum = vec![0.0f64; bins];
    let mut frames = 0usize;
    for_each_frame(samples, fft_size, |mags| {
        for (acc, &m) in sum.iter_mut().zip(mags) {
            *acc += m as f64;
        }
        frames += 1;
    });
    if frames == 0 {
        return vec![0.0; bins];
    }
    sum.iter().map(|&s| (s / frames as f64) as f32).collect()
}

/// Per-bin dB level (relative to the loudest bin of the whole STFT, clipped
/// to 80 dB below it) averaged over all frames.
pub fn average_db(samples: &[f32], fft_size: usize) -> Vec<f32> {
    let bins = fft_size / 2 + 1;
    let mut reference = 0.0f32;
    for_each_frame(samples, fft_size, |mags| {
        reference = mags.iter().copied().fold(reference, f32::max);
    });

    let ref_db = 20.0 * reference.max(AMIN).log10();
    let mut sum = vec![0.0f64; bins];
    let mut frames = 0usize;
    for_each_frame(samples, fft_size, |mags| {
        for (acc, &m) in sum.iter_mut().zip(mags) {
            let db = (20.0 * m.max(AMIN).log10() - ref_db).max(-TOP_DB);
            *acc += db as f64;
        }
        frames += 1;
    });
    if frames == 0 {
        return vec![-TOP_DB; bins];
    }
    sum.iter().map(|&s| (s / frames as f64) as f32).collect()
}

/// Convert a magnitude spectrum to dB relative to its own maximum, clipped
/// to 80 dB below it.
pub fn magnitude_to_db_relative(magnitudes: &[f32]) -> Vec<f32> {
    let reference = magnitudes.iter().copied().fold(0.0f32, f32::max);
    let ref_db = 20.0 * reference.max(AMIN).log10();
    magnitudes
        .iter()
        .map(|&m| (20.0 * m.max(AMIN).log10() - ref_db).max(-TOP_DB))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::sine;

    #[test]
    fn sine_energy_lands_in_expected_bin() {
        let sr = 48000;
        let fft_size = 4096;
        let spectrum = average_magnitude(&sine(1500.0, 0.5, sr, 1.0), fft_size);
        let freqs = bin_frequencies(sr, fft_size);
        let (peak_bin, _) = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert!((freqs[peak_bin] - 1500.0).abs() < sr as f32 / fft_size as f32);
    }

    #[test]
    fn empty_input_yields_floor() {
        assert!(average_magnitude(&[], 1024).iter().all(|&m| m == 0.0));
        assert!(average_db(&[], 1024).iter().all(|&d| d == -TOP_DB));
    }

    #[test]
    fn relative_db_peaks_at_zero() {
        let db = magnitude_to_db_relative(&[0.1, 1.0, 0.0]);
        assert_eq!(db[1], 0.0);
        assert!((db[0] + 20.0).abs() < 1e-4);
        assert_eq!(db[2], -TOP_DB);
    }
}
