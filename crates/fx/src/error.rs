//! Error types for effect instances.

/// The render collaborator could not build resources for an effect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct BuildError(pub String);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("lifespan must be a positive number of seconds, got {0}")]
    Lifespan(f32),
    #[error("particle count must be at least 1")]
    NoParticles,
    #[error("texture frame count must be at least 1")]
    NoTextureFrames,
}

#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("{instance}: resource build failed: {source}")]
    BuildFailure {
        instance: String,
        #[source]
        source: BuildError,
    },
    #[error("{instance}: reference object '{target}' not found, tracking disabled")]
    LookupFailure { instance: String, target: String },
    #[error("invalid billboard mode '{0}' (expected none, 2d or 3d)")]
    InvalidMode(String),
    #[error(transparent)]
    Audio(#[from] audio::AudioError),
}
