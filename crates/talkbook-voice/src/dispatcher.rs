//! Applies recognized commands to the current screen.

use crate::capability::{Capability, ScreenCapabilities};
use crate::error::VoiceError;
use crate::feedback::VoiceFeedbackChannel;
use crate::recognizer::VoiceCommandRecognizer;
use crate::types::{RecognizedCommand, VoiceCommand, VoiceCommandResult};

/// Turns recognized commands into actions and exactly one result each.
///
/// Commands with `Unknown` confidence are reported back but never executed.
#[derive(Default)]
pub struct CommandDispatcher {
    recognizer: VoiceCommandRecognizer,
    feedback: Option<VoiceFeedbackChannel>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speak every result of `handle_utterance` through `feedback`.
    pub fn with_feedback(mut self, feedback: VoiceFeedbackChannel) -> Self {
        self.feedback = Some(feedback);
        self
    }

    /// Execute `recognized` against `caps`.
    pub async fn dispatch(
        &self,
        recognized: &RecognizedCommand,
        caps: &ScreenCapabilities,
    ) -> VoiceCommandResult {
        let outcome = if recognized.confidence.is_executable() {
            match recognized.command.capability() {
                Some(capability) if !caps.supports(capability) => {
                    Err(VoiceError::CapabilityUnavailable(capability))
                }
                _ => self.execute(&recognized.command, caps).await,
            }
        } else {
            Err(match &recognized.command {
                VoiceCommand::Unknown(raw) => VoiceError::RecognitionMiss(raw.clone()),
                _ => VoiceError::LowConfidenceReject(recognized.original_text.clone()),
            })
        };

        let result = match outcome {
            Ok(message) => VoiceCommandResult::success(recognized.command.clone(), message),
            Err(e) => {
                tracing::debug!(command = %recognized.command, error = %e, "Voice command not executed");
                VoiceCommandResult::failure(recognized.command.clone(), e.feedback_message())
            }
        };
        tracing::info!(
            command = %recognized.command,
            confidence = %recognized.confidence,
            success = result.is_success(),
            "Voice command dispatched"
        );
        result
    }

    /// Recognize `text`, dispatch it and speak the outcome.
    pub async fn handle_utterance(&self, text: &str, caps: &ScreenCapabilities) -> VoiceCommandResult {
        let recognized = self.recognizer.recognize_or_unknown(text);
        let result = self.dispatch(&recognized, caps).await;
        if let Some(feedback) = &self.feedback {
            feedback.speak(result.message());
        }
        result
    }

    async fn execute(
        &self,
        command: &VoiceCommand,
        caps: &ScreenCapabilities,
    ) -> Result<String, VoiceError> {
        match command {
            VoiceCommand::GoBack => {
                let navigator = caps
                    .navigator()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Navigation))?;
                if navigator.go_back() {
                    Ok("前の画面に戻りました".to_string())
                } else {
                    Err(VoiceError::Action("これ以上戻れません".to_string()))
                }
            }
            VoiceCommand::NavigateTo(destination) => {
                let navigator = caps
                    .navigator()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Navigation))?;
                if navigator.navigate_to(destination) {
                    Ok(format!("{}を開きました", destination.label()))
                } else {
                    Err(VoiceError::Action(format!(
                        "{}へ移動できません",
                        destination.label()
                    )))
                }
            }
            VoiceCommand::StartRecording => {
                let recorder = caps
                    .recorder()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Recording))?;
                recorder.start().await?;
                Ok("録音を開始しました".to_string())
            }
            VoiceCommand::StopRecording => {
                let recorder = caps
                    .recorder()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Recording))?;
                let recording = recorder.stop().await?;
                Ok(format!(
                    "録音を停止しました（{}秒）",
                    recording.duration_ms / 1000
                ))
            }
            VoiceCommand::PauseRecording => {
                let recorder = caps
                    .recorder()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Recording))?;
                recorder.pause().await?;
                Ok("録音を一時停止しました".to_string())
            }
            VoiceCommand::ResumeRecording => {
                let recorder = caps
                    .recorder()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Recording))?;
                recorder.resume().await?;
                Ok("録音を再開しました".to_string())
            }
            VoiceCommand::Save => {
                let saver = caps
                    .saver()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::Save))?;
                saver.save().await.map_err(VoiceError::Action)?;
                Ok("保存しました".to_string())
            }
            VoiceCommand::ReadAloud => {
                let reader = caps
                    .reader()
                    .ok_or(VoiceError::CapabilityUnavailable(Capability::ReadAloud))?;
                reader.read_aloud().map_err(VoiceError::Action)?;
                Ok("読み上げを開始します".to_string())
            }
            VoiceCommand::Unknown(raw) => Err(VoiceError::RecognitionMiss(raw.clone())),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
