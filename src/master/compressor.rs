//! Feed-forward RMS compressor with a 2 dB soft knee and a single makeup gain.

use super::preset::MasteringParams;
use super::MasteringState;

/// Length of the moving mean-square window, in samples.
const RMS_WINDOW: usize = 256;
const KNEE_WIDTH_DB: f32 = 2.0;
const MAKEUP_LOUD: f32 = 1.2;
const MAKEUP_TRANSPARENT: f32 = 0.9;

#[derive(Debug, Clone)]
pub struct Compressor {
    pub threshold_db: f32,
    pub ratio: f32,
    /// Release time constant, in samples.
    pub release_samples: usize,
    pub makeup_gain: f32,
}

impl Compressor {
    pub fn from_params(params: &MasteringParams, sample_rate: u32) -> Self {
        let threshold_db = -24.0 + (10.0 - params.dynamic_range_target);
        let release_samples =
            ((params.transient_mode.release_seconds() * sample_rate as f32).round() as usize).max(1);
        let k = if params.loudness_maximize {
            MAKEUP_LOUD
        } else {
            MAKEUP_TRANSPARENT
        };
        let ratio = params.compression_ratio;
        Self {
            threshold_db,
            ratio,
            release_samples,
            makeup_gain: k / (1.0 - 1.0 / ratio),
        }
    }

    pub fn process(&self, mut state: MasteringState) -> MasteringState {
        log::info!(
            "Compressor: {:.1}:1, threshold {:.1} dB, release {} samples, makeup x{:.3}",
            self.ratio,
            self.threshold_db,
            self.release_samples,
            self.makeup_gain
        );
        for channel in state.channels.iter_mut() {
            self.process_channel(channel);
        }
        state
    }

    fn process_channel(&self, samples: &mut [f32]) {
        let envelope = rms_envelope(samples);
        let coef = (-1.0 / self.release_samples as f64).exp();

        let threshold = 10f32.powf(self.threshold_db / 20.0);
        let knee_lower = 10f32.powf((self.threshold_db - KNEE_WIDTH_DB) / 20.0);
        let knee_upper = 10f32.powf((self.threshold_db + KNEE_WIDTH_DB) / 20.0);
        let exponent = 1.0 - 1.0 / self.ratio;

        let mut smoothed = 0.0f64;
        for (i, s) in samples.iter_mut().enumerate() {
            if i > 0 {
                let env = envelope[i];
                smoothed = if env > smoothed {
                    env
                } else {
                    coef * smoothed + (1.0 - coef) * env
                };
            }
            let level = smoothed as f32;

            let gain = if level < knee_lower {
                1.0
            } else if level <= knee_upper {
                let knee = (level - knee_lower) / (knee_upper - knee_lower);
                1.0 - knee * (1.0 - (threshold / level).powf(exponent))
            } else {
                (threshold / level).powf(exponent)
            };
            *s *= gain * self.makeup_gain;
        }
    }
}

/// Centered moving RMS: sample `i` averages squares over `i-128..=i+127`,
/// treating samples outside the buffer as zero.
fn rms_envelope(samples: &[f32]) -> Vec<f64> {
    let n = samples.len();
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0f64);
    let mut acc = 0.0f64;
    for &s in samples {
        acc += s as f64 * s as f64;
        prefix.push(acc);
    }

    let before = RMS_WINDOW / 2;
    let after = RMS_WINDOW - before - 1;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(before);
            let hi = (i + after + 1).min(n);
            ((prefix[hi] - prefix[lo]).max(0.0) / RMS_WINDOW as f64).sqrt()
        })
        .collect()
}
