//! Error types for the recording session.

use talkbook_capture::CaptureError;

use crate::state::{RecordingState, SessionAction};

/// Failures of a recording session operation.
///
/// Returned as values from every controller operation; none of these is fatal
/// and each is recoverable by the user (grant permission, retry once bound,
/// start a recording first).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Microphone permission has not been granted")]
    PermissionDenied,
    #[error("Recording service is not connected")]
    ServiceUnavailable,
    #[error("No recording is in progress")]
    NoActiveRecording,
    #[error("Cannot {action} a recording while {from}")]
    InvalidTransition {
        from: RecordingState,
        action: SessionAction,
    },
    #[error("Capture error: {0}")]
    Capture(CaptureError),
    #[error("Session task failed: {0}")]
    Internal(String),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Disconnected | CaptureError::Busy => SessionError::ServiceUnavailable,
            other => SessionError::Capture(other),
        }
    }
}
