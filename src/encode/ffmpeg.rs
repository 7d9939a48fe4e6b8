use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{MasterError, Result};

/// Integrated loudness and true-peak pair handed to the normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessTarget {
    pub integrated_lufs: f32,
    pub true_peak_db: f32,
    pub sample_rate: u32,
}

/// Normalize-to-target capability. Blocks until `output` is written.
pub trait LoudnessNormalizer {
    fn normalize(&self, input: &Path, output: &Path, target: &LoudnessTarget) -> Result<()>;
}

/// Lossy export capability. Blocks until `output` is written.
pub trait Transcoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Single-pass `loudnorm` filter writing 32-bit float PCM.
#[derive(Debug, Clone)]
pub struct FfmpegLoudnorm {
    pub binary: PathBuf,
    pub loudness_range: f32,
}

impl Default for FfmpegLoudnorm {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            loudness_range: 11.0,
        }
    }
}

impl LoudnessNormalizer for FfmpegLoudnorm {
    fn normalize(&self, input: &Path, output: &Path, target: &LoudnessTarget) -> Result<()> {
        let filter = format!(
            "loudnorm=I={}:TP={}:LRA={}:dual_mono=true:linear=true",
            target.integrated_lufs, target.true_peak_db, self.loudness_range
        );
        let args = vec![
            "-y".to_string(),
            "-i".into(), path_arg(input),
            "-af".into(), filter,
            "-ar".into(), target.sample_rate.to_string(),
            "-c:a".into(), "pcm_f32le".into(),
            path_arg(output),
        ];
        run(&self.binary, &args)?;
        log::info!(
            "Loudness normalized to {:.1} LUFS / {:.1} dBTP",
            target.integrated_lufs,
            target.true_peak_db
        );
        Ok(())
    }
}

/// MP3 export at a fixed bitrate.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    pub binary: PathBuf,
    pub bitrate: String,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            bitrate: "320k".into(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path) -> Result<()> {
        let args = vec![
            "-y".to_string(),
            "-i".into(), path_arg(input),
            "-b:a".into(), self.bitrate.clone(),
            "-q:a".into(), "0".into(),
            path_arg(output),
        ];
        run(&self.binary, &args)?;
        log::info!("Transcoded {} at {}", output.display(), self.bitrate);
        Ok(())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn run(binary: &Path, args: &[String]) -> Result<()> {
    let tool = binary.display().to_string();
    log::debug!("Running {} {}", tool, args.join(" "));

    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| MasterError::ExternalTool {
            tool: tool.clone(),
            message: format!("failed to spawn ({}). Is ffmpeg installed?", e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        // ffmpeg prints its banner first; the cause is at the end
        let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
        let message = tail.into_iter().rev().collect::<Vec<_>>().join("\n");
        return Err(MasterError::ExternalTool {
            tool,
            message: format!("exited with {}: {}", output.status, message),
        });
    }
    Ok(())
}
