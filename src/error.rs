use thiserror::Error;

use crate::track::TrackId;

/// Result alias carrying [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Track {0} not found")]
    UnknownTrack(TrackId),

    #[error("Track {id} is a {expected} track, cannot take {found} parameters")]
    KindMismatch {
        id: TrackId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Render cancelled")]
    Cancelled,

    #[error("Export worker panicked")]
    WorkerPanicked,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV encoding error: {0}")]
    Wav(#[from] hound::Error),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// Numeric failure inside a generator. The render driver turns these into
/// silence; they only escape through `Engine::try_render`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("track {track} produced a non-finite sample")]
    NonFinite { track: TrackId },
}
