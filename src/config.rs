use luvmaster::master::preset::Platform;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub master: MasterConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize)]
pub struct MasterConfig {
    #[serde(default = "default_platform")]
    pub platform: Platform,
    #[serde(default)]
    pub auto: bool,
}

#[derive(Debug, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    /// Loudness range handed to the loudnorm filter.
    #[serde(default = "default_lra")]
    pub lra: f32,
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_transients")]
    pub max_transients: usize,
    #[serde(default = "default_logged_resonances")]
    pub logged_resonances: usize,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            auto: false,
        }
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            lra: default_lra(),
            bitrate: default_bitrate(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_transients: default_max_transients(),
            logged_resonances: default_logged_resonances(),
        }
    }
}

fn default_platform() -> Platform { Platform::Spotify }
fn default_binary() -> PathBuf { PathBuf::from("ffmpeg") }
fn default_lra() -> f32 { 11.0 }
fn default_bitrate() -> String { "320k".into() }
fn default_max_transients() -> usize { 50 }
fn default_logged_resonances() -> usize { 5 }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, else `luvmaster.toml`, else the per-user config file.
pub fn discover(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from("luvmaster.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("luvmaster").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("luvmaster").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("luvmaster.toml");
        std::fs::write(&path, "[master]\nplatform = \"tidal\"\n\n[ffmpeg]\nlra = 7.0\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.master.platform, Platform::Tidal);
        assert!(!cfg.master.auto);
        assert_eq!(cfg.ffmpeg.lra, 7.0);
        assert_eq!(cfg.ffmpeg.bitrate, "320k");
        assert_eq!(cfg.analysis.max_transients, 50);
    }

    #[test]
    fn unknown_platform_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[master]\nplatform = \"vinyl\"\n").unwrap();
        assert!(load_config(&path).is_none());
        assert!(load_config(&dir.path().join("missing.toml")).is_none());
    }
}
