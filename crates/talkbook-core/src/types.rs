use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Progress of the downstream transcription of a finalized recording.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionStatus {
    /// Recording finalized, transcription not yet requested.
    #[default]
    Pending,
    /// Transcription service is working on the audio file.
    InProgress,
    /// Transcribed text is available.
    Completed,
    /// Transcription service reported an error.
    Failed,
}

impl fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptionStatus::Pending => write!(f, "pending"),
            TranscriptionStatus::InProgress => write!(f, "in_progress"),
            TranscriptionStatus::Completed => write!(f, "completed"),
            TranscriptionStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Observable lifecycle of a recording session.
///
/// Never stored: the session crate derives it from the capture process
/// signals. Transition rules live next to the derivation in
/// `talkbook_session::state`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingState {
    /// No recording reference exists.
    #[default]
    Idle,
    /// The capture process is actively capturing.
    Recording,
    /// The capture process acknowledged a pause; the recording is unfinished.
    Paused,
    /// The last session was stopped (explicitly, or by losing the capture process).
    Stopped,
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingState::Idle => write!(f, "Idle"),
            RecordingState::Recording => write!(f, "Recording"),
            RecordingState::Paused => write!(f, "Paused"),
            RecordingState::Stopped => write!(f, "Stopped"),
        }
    }
}

// =============================================================================
// Newtype Wrappers - Identifiers
// =============================================================================

/// Unique identifier of a recording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordingId(pub Uuid);

impl RecordingId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier of a chapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(pub Uuid);

impl ChapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier of a document (a book made of chapters).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Domain Structs
// =============================================================================

/// A single dictation captured by the audio capture process.
///
/// Created when capture starts, finalized on stop and later updated by the
/// transcription consumer. Ownership passes to the chapter it is attached to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    /// Audio file written by the capture process.
    pub file_path: PathBuf,
    pub duration_ms: u64,
    pub transcription_status: TranscriptionStatus,
    pub transcribed_text: Option<String>,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    /// Create a fresh recording writing to `file_path`, with zero duration.
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            id: RecordingId::new(),
            file_path,
            duration_ms: 0,
            transcription_status: TranscriptionStatus::Pending,
            transcribed_text: None,
            title: None,
            created_at: Utc::now(),
        }
    }

    /// Create a recording whose audio file is `<dir>/<id>.wav`.
    pub fn in_dir(dir: &std::path::Path) -> Self {
        let id = RecordingId::new();
        Self {
            file_path: dir.join(format!("{}.wav", id)),
            id,
            ..Self::new(PathBuf::new())
        }
    }

    /// Whether transcribed text is available.
    pub fn is_transcribed(&self) -> bool {
        self.transcription_status == TranscriptionStatus::Completed
    }
}

/// A chapter of a document, as seen by the recording core.
///
/// Only the fields the auto-save path touches; the persistence format is
/// owned by the repository implementation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub document_id: DocumentId,
    pub title: String,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(document_id: DocumentId, title: impl Into<String>) -> Self {
        Self {
            id: ChapterId::new(),
            document_id,
            title: title.into(),
            content: String::new(),
            updated_at: Utc::now(),
        }
    }
}
