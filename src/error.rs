use thiserror::Error;

/// Errors that abort a run. Analysis degradations and external tool
/// failures with a fallback path are not represented here.
#[derive(Error, Debug)]
pub enum MasterError {
    /// Input could not be opened, probed or contained no audio track.
    #[error("Failed to load audio: {0}")]
    Load(String),

    #[error("Audio decode error: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV write error: {0}")]
    Wav(#[from] hound::Error),

    /// An external process exited non-zero or could not be spawned.
    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    #[error("Analysis report is missing {0}")]
    IncompleteReport(&'static str),
}

pub type Result<T> = std::result::Result<T, MasterError>;
