use crate::error::{MasterError, Result};

/// Level reported for zero energy, in dB / LUFS.
pub const SILENCE_DB: f32 = -80.0;

/// Decoded audio held fully in memory. Channels are stored planar.
#[derive(Clone, Debug)]
pub struct AudioSignal {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl AudioSignal {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if channels.is_empty() {
            return Err(MasterError::InvalidSignal("no channels".into()));
        }
        if sample_rate == 0 {
            return Err(MasterError::InvalidSignal("sample rate is zero".into()));
        }
        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(MasterError::InvalidSignal(
                "channel buffers differ in length".into(),
            ));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_stereo(&self) -> bool {
        self.channels.len() >= 2
    }

    /// Number of sample frames per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f32 {
        self.len() as f32 / self.sample_rate as f32
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Average of all channels.
    pub fn mono_sum(&self) -> Vec<f32> {
        if self.channels.len() == 1 {
            return self.channels[0].clone();
        }
        let n = self.channels.len() as f32;
        (0..self.len())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() / n)
            .collect()
    }

    /// First two channels, or `None` for mono input.
    pub fn stereo_pair(&self) -> Option<(&[f32], &[f32])> {
        if self.is_stereo() {
            Some((&self.channels[0], &self.channels[1]))
        } else {
            None
        }
    }
}

/// `20·log10(x)`, or [`SILENCE_DB`] for non-positive input. Quiet but
/// non-zero levels are not floored.
pub fn amplitude_to_db(x: f32) -> f32 {
    if x > 0.0 {
        20.0 * x.log10()
    } else {
        SILENCE_DB
    }
}

pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}

pub fn mean_square(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_channels() {
        let err = AudioSignal::stereo(vec![0.0; 4], vec![0.0; 3], 44100);
        assert!(err.is_err());
    }

    #[test]
    fn mono_sum_averages_channels() {
        let sig = AudioSignal::stereo(vec![1.0, 0.5], vec![0.0, -0.5], 48000).unwrap();
        assert_eq!(sig.mono_sum(), vec![0.5, 0.0]);
        assert_eq!(sig.len(), 2);
        assert!(sig.is_stereo());
    }

    #[test]
    fn db_helpers_floor_silence() {
        assert_eq!(amplitude_to_db(0.0), SILENCE_DB);
        assert!((amplitude_to_db(1.0)).abs() < 1e-6);
        assert!((db_to_gain(-6.0) - 0.501_187).abs() < 1e-5);
    }

    #[test]
    fn quiet_levels_are_not_floored() {
        assert!((amplitude_to_db(1e-6) + 120.0).abs() < 1e-3);
        assert_eq!(amplitude_to_db(-0.5), SILENCE_DB);
    }
}
