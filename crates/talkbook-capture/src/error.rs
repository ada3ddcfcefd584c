//! Error types for the capture process boundary.

/// Errors reported by the capture process or its host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Capture process is held by another session")]
    Busy,
    #[error("Capture process is not reachable")]
    Disconnected,
    #[error("A recording is already in progress")]
    AlreadyActive,
    #[error("No recording is being captured")]
    NotActive,
    #[error("Recording is not paused")]
    NotPaused,
    #[error("Capture failed: {0}")]
    Failed(String),
}
