//! Talkbook Voice crate - hands-free control through spoken commands.
//!
//! Recognizes commands in transcribed speech, dispatches them against the
//! capabilities of the current screen (navigation, the recording session,
//! read-aloud, save) and speaks the outcome back to the user.

pub mod capability;
pub mod dispatcher;
pub mod error;
pub mod feedback;
pub mod recognizer;
pub mod types;

pub use capability::{Capability, DocumentSaver, Navigator, ReadAloudSink, ScreenCapabilities};
pub use dispatcher::CommandDispatcher;
pub use error::VoiceError;
pub use feedback::{LogSpeechSink, SpeechSink, VoiceFeedbackChannel};
pub use recognizer::{normalize, recognize, recognize_or_unknown, VoiceCommandRecognizer};
pub use types::{
    CommandConfidence, Destination, RecognizedCommand, VoiceCommand, VoiceCommandResult,
};
