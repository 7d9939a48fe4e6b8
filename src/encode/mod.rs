pub mod ffmpeg;

pub use ffmpeg::{
    FfmpegLoudnorm, FfmpegTranscoder, LoudnessNormalizer, LoudnessTarget, Transcoder,
};
