use super::preset::{MasteringParams, StereoMode};
use super::MasteringState;
use crate::audio::signal::peak;
use crate::biquad::{butterworth, filtered, PassType};

const CLIP_CEILING: f32 = 0.99;
const NATURAL_HP_HZ: f64 = 2000.0;
const NATURAL_AMOUNT: f32 = 0.3;
const AGGRESSIVE_HP_HZ: f64 = 500.0;
const AGGRESSIVE_AMOUNT: f32 = 0.4;

/// Mid/side width control with mode-dependent high-band widening.
#[derive(Debug, Clone)]
pub struct StereoProcessor {
    pub width: f32,
    pub mode: StereoMode,
}

impl StereoProcessor {
    pub fn from_params(params: &MasteringParams) -> Self {
        Self {
            width: params.width,
            mode: params.stereo_mode,
        }
    }

    pub fn process(&self, mut state: MasteringState) -> MasteringState {
        if state.channels.len() < 2 {
            return state;
        }
        let sr = state.sample_rate as f64;
        let nyquist = sr / 2.0;

        let (left, right) = (&state.channels[0], &state.channels[1]);
        let mid: Vec<f32> = left.iter().zip(right).map(|(l, r)| (l + r) / 2.0).collect();
        let mut side: Vec<f32> = left
            .iter()
            .zip(right)
            .map(|(l, r)| (l - r) / 2.0 * self.width)
            .collect();

        let enhancement = match self.mode {
            StereoMode::Natural | StereoMode::Pristine if self.width > 1.0 => {
                Some((NATURAL_HP_HZ, (self.width - 1.0) * NATURAL_AMOUNT))
            }
            StereoMode::Aggressive => Some((AGGRESSIVE_HP_HZ, AGGRESSIVE_AMOUNT)),
            _ => None,
        };
        if let Some((cutoff, amount)) = enhancement.filter(|(cutoff, _)| *cutoff < nyquist) {
            let high = filtered(&butterworth(PassType::Highpass, 2, cutoff, sr), &side);
            for (s, h) in side.iter_mut().zip(&high) {
                *s += h * amount;
            }
        }

        let mut out_left: Vec<f32> = mid.iter().zip(&side).map(|(m, s)| m + s).collect();
        let mut out_right: Vec<f32> = mid.iter().zip(&side).map(|(m, s)| m - s).collect();

        let max = peak(&out_left).max(peak(&out_right));
        if max > CLIP_CEILING {
            let scale = CLIP_CEILING / max;
            log::debug!("Stereo stage scaled by {:.3} to avoid clipping", scale);
            for s in out_left.iter_mut().chain(out_right.iter_mut()) {
                *s *= scale;
            }
        }

        log::info!("Stereo: width {:.0}%, mode {:?}", self.width * 100.0, self.mode);
        state.channels[0] = out_left;
        state.channels[1] = out_right;
        state
    }
}
