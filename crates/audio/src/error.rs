use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio file not found: {0}")]
    AssetMissing(PathBuf),
    #[error("could not decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("unknown audio buffer {0}")]
    UnknownBuffer(usize),
    #[error("audio device error: {0}")]
    Device(String),
    #[error("invalid audio behavior '{0}' (expected none, continuous, once or random)")]
    InvalidBehavior(String),
}
