use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RecordingId, RecordingState};

/// Events published by a recording session controller.
///
/// Delivered over a broadcast channel to UI observers and the event log.
/// Events are emitted after the state change they describe has been applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The capture process started a new recording.
    RecordingStarted {
        recording_id: RecordingId,
        timestamp: DateTime<Utc>,
    },

    /// The capture process acknowledged a pause.
    RecordingPaused {
        recording_id: RecordingId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Capture resumed after a pause.
    RecordingResumed {
        recording_id: RecordingId,
        timestamp: DateTime<Utc>,
    },

    /// The recording was finalized.
    RecordingStopped {
        recording_id: RecordingId,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The link to the capture process was lost without a disconnect request.
    CaptureDisconnected {
        /// Whether a recording was being captured when the link dropped.
        was_recording: bool,
        timestamp: DateTime<Utc>,
    },

    /// The derived recording state changed.
    StateChanged {
        from: RecordingState,
        to: RecordingState,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            SessionEvent::RecordingStarted { timestamp, .. }
            | SessionEvent::RecordingPaused { timestamp, .. }
            | SessionEvent::RecordingResumed { timestamp, .. }
            | SessionEvent::RecordingStopped { timestamp, .. }
            | SessionEvent::CaptureDisconnected { timestamp, .. }
            | SessionEvent::StateChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a stable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::RecordingStarted { .. } => "recording_started",
            SessionEvent::RecordingPaused { .. } => "recording_paused",
            SessionEvent::RecordingResumed { .. } => "recording_resumed",
            SessionEvent::RecordingStopped { .. } => "recording_stopped",
            SessionEvent::CaptureDisconnected { .. } => "capture_disconnected",
            SessionEvent::StateChanged { .. } => "state_changed",
        }
    }
}
