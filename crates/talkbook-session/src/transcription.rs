//! Transcription of finalized recordings.
//!
//! Runs after `stop()` and only touches the recording's transcription fields;
//! a failure is reported for that recording and never affects session state.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use talkbook_core::types::{Recording, TranscriptionStatus};
use talkbook_core::{Result, TalkbookError};

// =============================================================================
// Trait
// =============================================================================

/// Speech-to-text over a finalized audio file.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Transcribe the audio at `file_path` into text.
    async fn transcribe(&self, file_path: &Path) -> Result<String>;
}

/// Move `recording` through IN_PROGRESS to COMPLETED or FAILED.
///
/// Whitespace-only output completes the recording without text.
pub async fn transcribe_recording(
    service: &dyn TranscriptionService,
    recording: &mut Recording,
) -> Result<()> {
    recording.transcription_status = TranscriptionStatus::InProgress;
    tracing::debug!(recording_id = %recording.id, "Transcription started");

    match service.transcribe(&recording.file_path).await {
        Ok(text) => {
            let text = text.trim();
            recording.transcribed_text = (!text.is_empty()).then(|| text.to_string());
            recording.transcription_status = TranscriptionStatus::Completed;
            tracing::info!(
                recording_id = %recording.id,
                chars = text.chars().count(),
                "Transcription completed"
            );
            Ok(())
        }
        Err(e) => {
            recording.transcription_status = TranscriptionStatus::Failed;
            tracing::warn!(recording_id = %recording.id, error = %e, "Transcription failed");
            Err(match e {
                TalkbookError::Transcription(msg) => TalkbookError::Transcription(msg),
                other => TalkbookError::Transcription(other.to_string()),
            })
        }
    }
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Transcription service returning canned text or a canned failure.
#[derive(Debug)]
pub struct MockTranscription {
    outcome: std::result::Result<String, String>,
    calls: AtomicUsize,
}

impl MockTranscription {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTranscription {
    fn default() -> Self {
        Self::new("[mock transcription]")
    }
}

#[async_trait]
impl TranscriptionService for MockTranscription {
    async fn transcribe(&self, file_path: &Path) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if file_path.as_os_str().is_empty() {
            return Err(TalkbookError::Transcription(
                "Cannot transcribe a recording without an audio file".to_string(),
            ));
        }
        self.outcome
            .clone()
            .map_err(TalkbookError::Transcription)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn finalized() -> Recording {
        let mut recording = Recording::new(PathBuf::from("/tmp/rec.wav"));
        recording.duration_ms = 1500;
        recording
    }

    #[tokio::test]
    async fn test_successful_transcription_completes() {
        let service = MockTranscription::new("  こんにちは世界  ");
        let mut recording = finalized();

        transcribe_recording(&service, &mut recording).await.unwrap();
        assert_eq!(recording.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(recording.transcribed_text.as_deref(), Some("こんにちは世界"));
        assert!(recording.is_transcribed());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_transcription_completes_without_text() {
        let service = MockTranscription::new("   ");
        let mut recording = finalized();

        transcribe_recording(&service, &mut recording).await.unwrap();
        assert_eq!(recording.transcription_status, TranscriptionStatus::Completed);
        assert!(recording.transcribed_text.is_none());
    }

    #[tokio::test]
    async fn test_failure_marks_recording_failed() {
        let service = MockTranscription::failing("model not loaded");
        let mut recording = finalized();

        let err = transcribe_recording(&service, &mut recording)
            .await
            .unwrap_err();
        assert!(matches!(err, TalkbookError::Transcription(ref m) if m == "model not loaded"));
        assert_eq!(recording.transcription_status, TranscriptionStatus::Failed);
        assert!(recording.transcribed_text.is_none());
        // Duration and identity are untouched.
        assert_eq!(recording.duration_ms, 1500);
    }

    #[tokio::test]
    async fn test_missing_audio_file_fails() {
        let service = MockTranscription::default();
        let mut recording = Recording::new(PathBuf::new());

        assert!(transcribe_recording(&service, &mut recording).await.is_err());
        assert_eq!(recording.transcription_status, TranscriptionStatus::Failed);
    }
}
