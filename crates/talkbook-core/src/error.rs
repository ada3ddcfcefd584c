use thiserror::Error;

/// Top-level error type for the Talkbook core.
///
/// Covers the ambient concerns (configuration, I/O, serialization) and the
/// external collaborators the recording core talks to. The session and voice
/// crates define their own error types for the state machine and dispatch
/// paths.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TalkbookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<toml::de::Error> for TalkbookError {
    fn from(err: toml::de::Error) -> Self {
        TalkbookError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TalkbookError {
    fn from(err: toml::ser::Error) -> Self {
        TalkbookError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TalkbookError {
    fn from(err: serde_json::Error) -> Self {
        TalkbookError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Talkbook core operations.
pub type Result<T> = std::result::Result<T, TalkbookError>;
