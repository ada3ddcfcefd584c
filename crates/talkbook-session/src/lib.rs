//! Talkbook Session crate - recording session lifecycle.
//!
//! Connects a per-screen `RecordingSessionController` to the device-wide
//! capture process through a `SessionBinder`, derives the observable
//! `RecordingState` from capture signals, and serializes start/pause/resume/stop
//! against a single session. Also hosts the consumers that run after a
//! recording is finalized (transcription) and the debounced chapter auto-save.

pub mod autosave;
pub mod binder;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod permission;
pub mod state;
pub mod transcription;

pub use autosave::AutoSaveScheduler;
pub use binder::{BinderState, SessionBinder};
pub use controller::RecordingSessionController;
pub use debounce::Debouncer;
pub use error::SessionError;
pub use permission::{PermissionCheck, SharedPermission};
pub use state::{derive_state, RecordingState, SessionAction};
pub use transcription::{transcribe_recording, MockTranscription, TranscriptionService};
