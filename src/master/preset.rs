//! Per-platform mastering defaults and the merge with caller overrides.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Ratio for each compression level, 1 through 10.
pub const COMPRESSION_RATIOS: [f32; 10] = [1.5, 2.0, 2.5, 3.0, 4.0, 5.0, 6.0, 7.0, 8.5, 10.0];

const BAND_GAIN_LIMIT_DB: f32 = 12.0;
const WIDTH_RANGE: (f32, f32) = (0.0, 200.0);
const SATURATION_RANGE: (f32, f32) = (0.0, 100.0);
const LUFS_RANGE: (f32, f32) = (-40.0, 0.0);

pub fn compression_ratio(level: u8) -> f32 {
    COMPRESSION_RATIOS[(level.clamp(1, 10) - 1) as usize]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Spotify,
    Apple,
    Youtube,
    Tidal,
    Soundcloud,
    Deezer,
    Amazon,
    Pandora,
    Radio,
}

impl Platform {
    pub const ALL: [Platform; 9] = [
        Platform::Spotify,
        Platform::Apple,
        Platform::Youtube,
        Platform::Tidal,
        Platform::Soundcloud,
        Platform::Deezer,
        Platform::Amazon,
        Platform::Pandora,
        Platform::Radio,
    ];

    pub fn preset(self) -> &'static PlatformPreset {
        match self {
            Platform::Spotify => &SPOTIFY,
            Platform::Apple => &APPLE,
            Platform::Youtube => &YOUTUBE,
            Platform::Tidal => &TIDAL,
            Platform::Soundcloud => &SOUNDCLOUD,
            Platform::Deezer => &DEEZER,
            Platform::Amazon => &AMAZON,
            Platform::Pandora => &PANDORA,
            Platform::Radio => &RADIO,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Platform::Spotify => "spotify",
            Platform::Apple => "apple",
            Platform::Youtube => "youtube",
            Platform::Tidal => "tidal",
            Platform::Soundcloud => "soundcloud",
            Platform::Deezer => "deezer",
            Platform::Amazon => "amazon",
            Platform::Pandora => "pandora",
            Platform::Radio => "radio",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StereoMode {
    Pristine,
    Natural,
    Moderate,
    Aggressive,
}

/// How much of the transient detail the compressor keeps; selects its release time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransientMode {
    Maximum,
    High,
    Medium,
}

impl TransientMode {
    pub fn release_seconds(self) -> f32 {
        match self {
            TransientMode::Maximum => 0.150,
            TransientMode::High => 0.100,
            TransientMode::Medium => 0.080,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlatformPreset {
    pub target_lufs: f32,
    pub true_peak_db: f32,
    pub bass_db: f32,
    pub mids_db: f32,
    pub highs_db: f32,
    pub compression: u8,
    /// Percent; 100 leaves the side channel untouched.
    pub width: f32,
    /// Percent.
    pub saturation: f32,
    pub rolloff_hz: f32,
    pub bass_mono_hz: f32,
    pub stereo_mode: StereoMode,
    pub transient_mode: TransientMode,
    pub dynamic_range_target: f32,
    pub presence_boost: bool,
    pub bass_enhancement: bool,
    pub air_enhancement: bool,
    pub loudness_maximize: bool,
}

const BASE: PlatformPreset = PlatformPreset {
    target_lufs: -14.0,
    true_peak_db: -1.0,
    bass_db: 0.0,
    mids_db: 0.0,
    highs_db: 0.0,
    compression: 5,
    width: 100.0,
    saturation: 20.0,
    rolloff_hz: 20000.0,
    bass_mono_hz: 90.0,
    stereo_mode: StereoMode::Moderate,
    transient_mode: TransientMode::High,
    dynamic_range_target: 8.0,
    presence_boost: false,
    bass_enhancement: false,
    air_enhancement: false,
    loudness_maximize: false,
};

static SPOTIFY: PlatformPreset = BASE;

static APPLE: PlatformPreset = PlatformPreset {
    target_lufs: -16.0,
    compression: 4,
    saturation: 15.0,
    rolloff_hz: 22050.0,
    bass_mono_hz: 80.0,
    stereo_mode: StereoMode::Natural,
    transient_mode: TransientMode::Maximum,
    dynamic_range_target: 10.0,
    air_enhancement: true,
    ..BASE
};

static YOUTUBE: PlatformPreset = PlatformPreset {
    bass_mono_hz: 100.0,
    presence_boost: true,
    ..BASE
};

static TIDAL: PlatformPreset = PlatformPreset {
    compression: 4,
    width: 105.0,
    saturation: 10.0,
    rolloff_hz: 22050.0,
    bass_mono_hz: 70.0,
    stereo_mode: StereoMode::Pristine,
    transient_mode: TransientMode::Maximum,
    dynamic_range_target: 10.0,
    air_enhancement: true,
    ..BASE
};

static SOUNDCLOUD: PlatformPreset = PlatformPreset {
    target_lufs: -11.0,
    true_peak_db: -0.5,
    bass_db: 1.0,
    highs_db: 0.5,
    compression: 6,
    saturation: 30.0,
    rolloff_hz: 18000.0,
    bass_mono_hz: 120.0,
    stereo_mode: StereoMode::Aggressive,
    transient_mode: TransientMode::Medium,
    dynamic_range_target: 6.0,
    presence_boost: true,
    loudness_maximize: true,
    ..BASE
};

static DEEZER: PlatformPreset = PlatformPreset {
    target_lufs: -15.0,
    compression: 4,
    saturation: 15.0,
    rolloff_hz: 22050.0,
    bass_mono_hz: 80.0,
    stereo_mode: StereoMode::Natural,
    transient_mode: TransientMode::Maximum,
    dynamic_range_target: 9.0,
    air_enhancement: true,
    ..BASE
};

static AMAZON: PlatformPreset = PlatformPreset {
    true_peak_db: -2.0,
    rolloff_hz: 22050.0,
    stereo_mode: StereoMode::Natural,
    ..BASE
};

static PANDORA: PlatformPreset = PlatformPreset {
    true_peak_db: -2.0,
    mids_db: 0.5,
    width: 95.0,
    saturation: 25.0,
    rolloff_hz: 19000.0,
    bass_mono_hz: 100.0,
    transient_mode: TransientMode::Medium,
    dynamic_range_target: 7.0,
    presence_boost: true,
    ..BASE
};

static RADIO: PlatformPreset = PlatformPreset {
    target_lufs: -9.0,
    true_peak_db: -0.3,
    bass_db: 2.0,
    mids_db: 1.0,
    highs_db: 1.0,
    compression: 8,
    width: 90.0,
    saturation: 40.0,
    rolloff_hz: 16000.0,
    bass_mono_hz: 150.0,
    stereo_mode: StereoMode::Aggressive,
    transient_mode: TransientMode::Medium,
    dynamic_range_target: 5.0,
    presence_boost: true,
    bass_enhancement: true,
    loudness_maximize: true,
    ..BASE
};

/// Caller overrides. `None` keeps the platform default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserParams {
    pub bass: Option<f32>,
    pub mids: Option<f32>,
    pub highs: Option<f32>,
    /// Percent.
    pub width: Option<f32>,
    pub compression: Option<u8>,
    /// Percent.
    pub saturation: Option<f32>,
    pub target_lufs: Option<f32>,
}

impl UserParams {
    /// Clamp every set value into its documented range.
    pub fn sanitized(&self) -> Self {
        Self {
            bass: clamp_logged("bass", self.bass, -BAND_GAIN_LIMIT_DB, BAND_GAIN_LIMIT_DB),
            mids: clamp_logged("mids", self.mids, -BAND_GAIN_LIMIT_DB, BAND_GAIN_LIMIT_DB),
            highs: clamp_logged("highs", self.highs, -BAND_GAIN_LIMIT_DB, BAND_GAIN_LIMIT_DB),
            width: clamp_logged("width", self.width, WIDTH_RANGE.0, WIDTH_RANGE.1),
            compression: self.compression.map(|c| {
                let clamped = c.clamp(1, 10);
                if clamped != c {
                    log::warn!("compression level {} clamped to {}", c, clamped);
                }
                clamped
            }),
            saturation: clamp_logged(
                "saturation",
                self.saturation,
                SATURATION_RANGE.0,
                SATURATION_RANGE.1,
            ),
            target_lufs: clamp_logged("target LUFS", self.target_lufs, LUFS_RANGE.0, LUFS_RANGE.1),
        }
    }

    /// Fill fields left unset here from `other`.
    pub fn or(self, other: UserParams) -> Self {
        Self {
            bass: self.bass.or(other.bass),
            mids: self.mids.or(other.mids),
            highs: self.highs.or(other.highs),
            width: self.width.or(other.width),
            compression: self.compression.or(other.compression),
            saturation: self.saturation.or(other.saturation),
            target_lufs: self.target_lufs.or(other.target_lufs),
        }
    }
}

/// NaN is treated as unset.
fn clamp_logged(name: &str, value: Option<f32>, lo: f32, hi: f32) -> Option<f32> {
    value.filter(|v| !v.is_nan()).map(|v| {
        let clamped = v.clamp(lo, hi);
        if clamped != v {
            log::warn!("{} {} clamped to {}", name, v, clamped);
        }
        clamped
    })
}

/// Fully resolved parameters for one mastering run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MasteringParams {
    pub platform: Platform,
    pub target_lufs: f32,
    pub true_peak_db: f32,
    pub bass_db: f32,
    pub mids_db: f32,
    pub highs_db: f32,
    pub compression_level: u8,
    pub compression_ratio: f32,
    /// Side-channel multiplier (1.0 = unchanged).
    pub width: f32,
    /// Saturation amount, 0-1.
    pub saturation: f32,
    pub rolloff_hz: f32,
    pub bass_mono_hz: f32,
    pub stereo_mode: StereoMode,
    pub transient_mode: TransientMode,
    pub dynamic_range_target: f32,
    pub presence_boost: bool,
    pub bass_enhancement: bool,
    pub air_enhancement: bool,
    pub loudness_maximize: bool,
}

impl MasteringParams {
    /// Merge sanitized overrides over the platform preset. The shared preset
    /// table is never modified.
    pub fn resolve(platform: Platform, user: &UserParams) -> Self {
        let preset = platform.preset();
        let user = user.sanitized();
        let compression_level = user.compression.unwrap_or(preset.compression);
        Self {
            platform,
            target_lufs: user.target_lufs.unwrap_or(preset.target_lufs),
            true_peak_db: preset.true_peak_db,
            bass_db: user.bass.unwrap_or(preset.bass_db),
            mids_db: user.mids.unwrap_or(preset.mids_db),
            highs_db: user.highs.unwrap_or(preset.highs_db),
            compression_level,
            compression_ratio: compression_ratio(compression_level),
            width: user.width.unwrap_or(preset.width) / 100.0,
            saturation: user.saturation.unwrap_or(preset.saturation) / 100.0,
            rolloff_hz: preset.rolloff_hz,
            bass_mono_hz: preset.bass_mono_hz,
            stereo_mode: preset.stereo_mode,
            transient_mode: preset.transient_mode,
            dynamic_range_target: preset.dynamic_range_target,
            presence_boost: preset.presence_boost,
            bass_enhancement: preset.bass_enhancement,
            air_enhancement: preset.air_enhancement,
            loudness_maximize: preset.loudness_maximize,
        }
    }

    /// Target true peak as linear amplitude.
    pub fn true_peak_linear(&self) -> f32 {
        10f32.powf(self.true_peak_db / 20.0)
    }
}
