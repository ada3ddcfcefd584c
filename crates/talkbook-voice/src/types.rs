//! Value objects of the voice command pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capability::Capability;

// =============================================================================
// Enums
// =============================================================================

/// Screens a voice command can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    Home,
    DocumentList,
    Settings,
    Recordings,
    Help,
}

impl Destination {
    /// Screen name used in spoken feedback.
    pub fn label(&self) -> &'static str {
        match self {
            Destination::Home => "ホーム",
            Destination::DocumentList => "文書一覧",
            Destination::Settings => "設定",
            Destination::Recordings => "録音一覧",
            Destination::Help => "ヘルプ",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Home => write!(f, "home"),
            Destination::DocumentList => write!(f, "document_list"),
            Destination::Settings => write!(f, "settings"),
            Destination::Recordings => write!(f, "recordings"),
            Destination::Help => write!(f, "help"),
        }
    }
}

impl std::str::FromStr for Destination {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "home" => Ok(Destination::Home),
            "document_list" => Ok(Destination::DocumentList),
            "settings" => Ok(Destination::Settings),
            "recordings" => Ok(Destination::Recordings),
            "help" => Ok(Destination::Help),
            _ => Err(format!("Unknown destination: {}", s)),
        }
    }
}

/// A command the app can execute in response to speech.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum VoiceCommand {
    GoBack,
    NavigateTo(Destination),
    StartRecording,
    StopRecording,
    PauseRecording,
    ResumeRecording,
    Save,
    ReadAloud,
    /// Speech that matched no command; carries the normalized utterance.
    Unknown(String),
}

impl VoiceCommand {
    /// The screen capability the command acts on, if any.
    pub fn capability(&self) -> Option<Capability> {
        match self {
            VoiceCommand::GoBack | VoiceCommand::NavigateTo(_) => Some(Capability::Navigation),
            VoiceCommand::StartRecording
            | VoiceCommand::StopRecording
            | VoiceCommand::PauseRecording
            | VoiceCommand::ResumeRecording => Some(Capability::Recording),
            VoiceCommand::Save => Some(Capability::Save),
            VoiceCommand::ReadAloud => Some(Capability::ReadAloud),
            VoiceCommand::Unknown(_) => None,
        }
    }
}

impl fmt::Display for VoiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceCommand::GoBack => write!(f, "go_back"),
            VoiceCommand::NavigateTo(destination) => write!(f, "navigate_to:{}", destination),
            VoiceCommand::StartRecording => write!(f, "start_recording"),
            VoiceCommand::StopRecording => write!(f, "stop_recording"),
            VoiceCommand::PauseRecording => write!(f, "pause_recording"),
            VoiceCommand::ResumeRecording => write!(f, "resume_recording"),
            VoiceCommand::Save => write!(f, "save"),
            VoiceCommand::ReadAloud => write!(f, "read_aloud"),
            VoiceCommand::Unknown(_) => write!(f, "unknown"),
        }
    }
}

/// How sure the recognizer is. Ordered so that `High` is the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandConfidence {
    /// Ambiguous or unmatched; never executed.
    Unknown,
    /// Bare keyword.
    Low,
    /// Command phrase embedded in a longer utterance.
    Medium,
    /// The utterance is exactly a command phrase.
    High,
}

impl CommandConfidence {
    pub fn is_executable(&self) -> bool {
        *self != CommandConfidence::Unknown
    }
}

impl fmt::Display for CommandConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandConfidence::Unknown => write!(f, "unknown"),
            CommandConfidence::Low => write!(f, "low"),
            CommandConfidence::Medium => write!(f, "medium"),
            CommandConfidence::High => write!(f, "high"),
        }
    }
}

// =============================================================================
// Structs
// =============================================================================

/// Output of the recognizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognizedCommand {
    pub command: VoiceCommand,
    pub confidence: CommandConfidence,
    /// The utterance after normalization.
    pub original_text: String,
}

impl RecognizedCommand {
    pub fn new(command: VoiceCommand, confidence: CommandConfidence, original_text: impl Into<String>) -> Self {
        Self {
            command,
            confidence,
            original_text: original_text.into(),
        }
    }

    /// An unmatched utterance.
    pub fn unknown(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            command: VoiceCommand::Unknown(text.clone()),
            confidence: CommandConfidence::Unknown,
            original_text: text,
        }
    }
}

/// Outcome of dispatching one command. Always carries a message to show or speak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceCommandResult {
    command: VoiceCommand,
    is_success: bool,
    message: String,
}

impl VoiceCommandResult {
    pub fn success(command: VoiceCommand, message: impl Into<String>) -> Self {
        Self {
            command,
            is_success: true,
            message: message.into(),
        }
    }

    pub fn failure(command: VoiceCommand, message: impl Into<String>) -> Self {
        Self {
            command,
            is_success: false,
            message: message.into(),
        }
    }

    pub fn command(&self) -> &VoiceCommand {
        &self.command
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// Tests
// =============================================================================
