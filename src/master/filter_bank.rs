//! Fixed-order EQ. Stages run in the order they are planned; each one sees the
//! output of the previous one.

use super::preset::MasteringParams;
use super::MasteringState;
use crate::biquad::{butterworth, filter_in_place, filtered, BiquadCoeffs, PassType};

const HIGHPASS_HZ: f64 = 20.0;
/// Band gains at or below this magnitude are skipped.
const GAIN_EPSILON_DB: f32 = 0.1;

const BASS_HZ: f64 = 100.0;
const BASS_Q: f64 = 0.7;
const BASS_ENHANCEMENT_DB: f32 = 1.5;
const MUD_HZ: f64 = 300.0;
const MUD_Q: f64 = 1.5;
const MUD_CUT_DB: f64 = -2.5;
const MIDS_HZ: f64 = 1000.0;
const MIDS_Q: f64 = 1.0;
const PRESENCE_MIDS_DB: f32 = 0.5;
const PRESENCE_HZ: f64 = 3000.0;
const PRESENCE_Q: f64 = 1.2;
const PRESENCE_DB: f64 = 1.0;
const HIGHS_HZ: f64 = 8000.0;
const HIGHS_Q: f64 = 0.7;
const AIR_HZ: f64 = 12000.0;
const AIR_Q: f64 = 1.0;
const AIR_DB: f64 = 0.5;

#[derive(Debug, Clone)]
pub enum FilterStage {
    /// Sections applied to every channel independently.
    Cascade {
        label: &'static str,
        sections: Vec<BiquadCoeffs>,
    },
    /// Low band of the channel average plus the high band of each channel.
    BassMono { cutoff_hz: f64 },
}

impl FilterStage {
    pub fn label(&self) -> &'static str {
        match self {
            FilterStage::Cascade { label, .. } => label,
            FilterStage::BassMono { .. } => "bass-mono",
        }
    }
}

pub struct FilterBank {
    stages: Vec<FilterStage>,
}

impl FilterBank {
    /// Plan the stages for `params`. `muddy` enables the low-mid correction.
    pub fn plan(params: &MasteringParams, sample_rate: u32, stereo: bool, muddy: bool) -> Self {
        let sr = sample_rate as f64;
        let mut planner = Planner {
            stages: Vec::new(),
            nyquist: sr / 2.0,
        };

        planner.cascade(
            "high-pass",
            HIGHPASS_HZ,
            butterworth(PassType::Highpass, 4, HIGHPASS_HZ, sr),
        );

        let bass_mono_hz = params.bass_mono_hz as f64;
        if stereo && bass_mono_hz < planner.nyquist {
            planner.stages.push(FilterStage::BassMono {
                cutoff_hz: bass_mono_hz,
            });
        }

        let mut bass = params.bass_db;
        if params.bass_enhancement {
            bass += BASS_ENHANCEMENT_DB;
        }
        if bass.abs() > GAIN_EPSILON_DB {
            planner.peaking("bass", BASS_HZ, BASS_Q, bass as f64, sr);
        }

        if muddy {
            planner.peaking("low-mid cut", MUD_HZ, MUD_Q, MUD_CUT_DB, sr);
        }

        let mut mids = params.mids_db;
        if params.presence_boost {
            mids += PRESENCE_MIDS_DB;
        }
        if mids.abs() > GAIN_EPSILON_DB {
            planner.peaking("mids", MIDS_HZ, MIDS_Q, mids as f64, sr);
        }

        if params.presence_boost {
            planner.peaking("presence", PRESENCE_HZ, PRESENCE_Q, PRESENCE_DB, sr);
        }

        if params.highs_db.abs() > GAIN_EPSILON_DB {
            planner.peaking("highs", HIGHS_HZ, HIGHS_Q, params.highs_db as f64, sr);
        }

        if params.air_enhancement {
            planner.cascade(
                "air",
                AIR_HZ,
                vec![BiquadCoeffs::high_shelf(AIR_HZ, AIR_Q, AIR_DB, sr)],
            );
        }

        let rolloff = params.rolloff_hz as f64;
        planner.cascade("rolloff", rolloff, butterworth(PassType::Lowpass, 2, rolloff, sr));

        Self {
            stages: planner.stages,
        }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn process(&self, mut state: MasteringState) -> MasteringState {
        let sr = state.sample_rate as f64;
        for stage in &self.stages {
            log::debug!("EQ stage: {}", stage.label());
            match stage {
                FilterStage::Cascade { sections, .. } => {
                    for channel in state.channels.iter_mut() {
                        filter_in_place(sections, channel);
                    }
                }
                FilterStage::BassMono { cutoff_hz } => {
                    state.channels = bass_mono(state.channels, *cutoff_hz, sr);
                }
            }
        }
        state
    }
}

struct Planner {
    stages: Vec<FilterStage>,
    nyquist: f64,
}

impl Planner {
    fn cascade(&mut self, label: &'static str, freq: f64, sections: Vec<BiquadCoeffs>) {
        if freq < self.nyquist {
            self.stages.push(FilterStage::Cascade { label, sections });
        } else {
            log::debug!("Skipping {} at {:.0} Hz (Nyquist {:.0} Hz)", label, freq, self.nyquist);
        }
    }

    fn peaking(&mut self, label: &'static str, freq: f64, q: f64, gain_db: f64, sr: f64) {
        self.cascade(label, freq, vec![BiquadCoeffs::peaking(freq, q, gain_db, sr)]);
    }
}

fn bass_mono(channels: Vec<Vec<f32>>, cutoff: f64, sample_rate: f64) -> Vec<Vec<f32>> {
    if channels.len() < 2 {
        return channels;
    }
    let average: Vec<f32> = channels[0]
        .iter()
        .zip(&channels[1])
        .map(|(l, r)| (l + r) / 2.0)
        .collect();
    let mono_bass = filtered(&butterworth(PassType::Lowpass, 4, cutoff, sample_rate), &average);
    let highpass = butterworth(PassType::Highpass, 4, cutoff, sample_rate);

    channels
        .into_iter()
        .map(|mut channel| {
            filter_in_place(&highpass, &mut channel);
            for (s, b) in channel.iter_mut().zip(&mono_bass) {
                *s += b;
            }
            channel
        })
        .collect()
}
