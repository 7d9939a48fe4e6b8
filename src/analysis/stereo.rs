use serde::Serialize;

use crate::audio::AudioSignal;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StereoField {
    /// Side/mid energy ratio clamped to `[0, 1]`.
    pub width: f32,
    /// Pearson correlation of left and right.
    pub correlation: f32,
    pub is_mono: bool,
}

impl StereoField {
    fn mono() -> Self {
        Self {
            width: 0.0,
            correlation: 1.0,
            is_mono: true,
        }
    }
}

pub struct StereoFieldAnalyzer;

impl StereoFieldAnalyzer {
    pub fn analyze(signal: &AudioSignal) -> StereoField {
        match signal.stereo_pair() {
            Some((left, right)) => Self::analyze_pair(left, right),
            None => StereoField::mono(),
        }
    }

    pub fn analyze_pair(left: &[f32], right: &[f32]) -> StereoField {
        let (mut mid_energy, mut side_energy) = (0.0f64, 0.0f64);
        for (&l, &r) in left.iter().zip(right) {
            let mid = (l as f64 + r as f64) / 2.0;
            let side = (l as f64 - r as f64) / 2.0;
            mid_energy += mid * mid;
            side_energy += side * side;
        }

        let width = if mid_energy > 0.0 {
            (side_energy / mid_energy).clamp(0.0, 1.0) as f32
        } else {
            0.0
        };
        let correlation = pearson(left, right);

        log::debug!("Stereo field: width={:.3}, correlation={:.3}", width, correlation);

        StereoField {
            width,
            correlation,
            is_mono: false,
        }
    }
}

/// Zero variance on either side counts as fully correlated.
fn pearson(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let mean_a = a[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0f64, 0.0f64, 0.0f64);
    for (&x, &y) in a[..n].iter().zip(&b[..n]) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 1.0;
    }
    (cov / (var_a * var_b).sqrt()).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::signal::test_signals::noise;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identical_channels_have_no_width() {
        let l = noise(0.5, 4096, 1);
        let field = StereoFieldAnalyzer::analyze_pair(&l, &l);
        assert_eq!(field.width, 0.0);
        assert_abs_diff_eq!(field.correlation, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn independent_noise_is_wide_and_uncorrelated() {
        let field = StereoFieldAnalyzer::analyze_pair(&noise(0.5, 44100, 1), &noise(0.5, 44100, 2));
        assert!(field.width > 0.9);
        assert!(field.correlation.abs() < 0.05);
    }

    #[test]
    fn inverted_channels_are_anti_correlated() {
        let l = noise(0.5, 4096, 3);
        let r: Vec<f32> = l.iter().map(|s| -s).collect();
        let field = StereoFieldAnalyzer::analyze_pair(&l, &r);
        assert_abs_diff_eq!(field.correlation, -1.0, epsilon = 1e-6);
        // No mid energy at all
        assert_eq!(field.width, 0.0);
    }

    #[test]
    fn mono_and_silence() {
        let mono = AudioSignal::mono(noise(0.5, 1024, 4), 44100).unwrap();
        let field = StereoFieldAnalyzer::analyze(&mono);
        assert!(field.is_mono);
        assert_eq!(field.width, 0.0);

        let silent = AudioSignal::stereo(vec![0.0; 1024], vec![0.0; 1024], 44100).unwrap();
        let field = StereoFieldAnalyzer::analyze(&silent);
        assert!(!field.is_mono);
        assert_eq!(field.width, 0.0);
        assert_eq!(field.correlation, 1.0);
    }
}
