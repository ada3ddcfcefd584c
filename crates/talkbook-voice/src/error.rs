//! Error types for voice command dispatch.

use talkbook_session::{RecordingState, SessionAction, SessionError};

use crate::capability::Capability;

/// Why a voice command did not run or did not succeed.
///
/// Every variant renders to a user-facing sentence via `feedback_message`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    #[error("Command not recognized: {0}")]
    RecognitionMiss(String),
    #[error("Command rejected due to low confidence: {0}")]
    LowConfidenceReject(String),
    #[error("Capability not available on this screen: {0}")]
    CapabilityUnavailable(Capability),
    #[error("Recording session error: {0}")]
    Session(#[from] SessionError),
    #[error("Action failed: {0}")]
    Action(String),
}

fn state_label(state: RecordingState) -> &'static str {
    match state {
        RecordingState::Idle => "待機中",
        RecordingState::Recording => "録音中",
        RecordingState::Paused => "一時停止中",
        RecordingState::Stopped => "停止後",
    }
}

fn action_label(action: SessionAction) -> &'static str {
    match action {
        SessionAction::Start => "録音を開始",
        SessionAction::Pause => "一時停止",
        SessionAction::Resume => "録音を再開",
        SessionAction::Stop => "録音を停止",
    }
}

impl VoiceError {
    /// Sentence to show or speak to the user.
    pub fn feedback_message(&self) -> String {
        match self {
            VoiceError::RecognitionMiss(raw) => format!("「{}」は認識できませんでした", raw),
            VoiceError::LowConfidenceReject(_) => {
                "コマンドを聞き取れませんでした。もう一度お話しください".to_string()
            }
            VoiceError::CapabilityUnavailable(capability) => {
                format!("この画面では{}は利用できません", capability.label())
            }
            VoiceError::Session(err) => match err {
                SessionError::PermissionDenied => "マイクの使用が許可されていません".to_string(),
                SessionError::ServiceUnavailable => "録音サービスに接続されていません".to_string(),
                SessionError::NoActiveRecording => "録音中ではありません".to_string(),
                SessionError::InvalidTransition { from, action } => format!(
                    "{}は{}できません",
                    state_label(*from),
                    action_label(*action)
                ),
                SessionError::Capture(e) => format!("録音でエラーが発生しました: {}", e),
                SessionError::Internal(_) => "録音処理に失敗しました".to_string(),
            },
            VoiceError::Action(msg) => format!("操作に失敗しました: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_error_display() {
        let err = VoiceError::CapabilityUnavailable(Capability::Save);
        assert_eq!(err.to_string(), "Capability not available on this screen: save");

        let err = VoiceError::from(SessionError::NoActiveRecording);
        assert_eq!(
            err.to_string(),
            "Recording session error: No recording is in progress"
        );
    }

    #[test]
    fn test_miss_message_echoes_raw_text() {
        let msg = VoiceError::RecognitionMiss("xyz".to_string()).feedback_message();
        assert!(msg.contains("xyz"));
    }

    #[test]
    fn test_low_confidence_message_is_fixed() {
        let a = VoiceError::LowConfidenceReject("ホームに戻って".to_string()).feedback_message();
        let b = VoiceError::LowConfidenceReject("something".to_string()).feedback_message();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_session_errors_have_messages() {
        let errors = [
            SessionError::PermissionDenied,
            SessionError::ServiceUnavailable,
            SessionError::NoActiveRecording,
            SessionError::InvalidTransition {
                from: RecordingState::Paused,
                action: SessionAction::Start,
            },
            SessionError::Internal("join error".to_string()),
        ];
        for err in errors {
            assert!(!VoiceError::Session(err).feedback_message().is_empty());
        }
        let msg = VoiceError::Session(SessionError::InvalidTransition {
            from: RecordingState::Paused,
            action: SessionAction::Start,
        })
        .feedback_message();
        assert_eq!(msg, "一時停止中は録音を開始できません");
    }

    #[test]
    fn test_capability_message_names_capability() {
        let msg = VoiceError::CapabilityUnavailable(Capability::Navigation).feedback_message();
        assert!(msg.contains("画面移動"));
    }
}
