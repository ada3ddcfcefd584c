//! Talkbook Capture crate - the audio capture process boundary.
//!
//! The capture process owns the microphone and runs independently of any
//! screen. It is reached through a `CaptureHost`, which hands out at most one
//! `CaptureLease` at a time, and reports its state as a single stream of
//! `CaptureSignals` snapshots. Includes a mock implementation for testing
//! without audio hardware.

pub mod error;
pub mod host;
pub mod mock;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::watch;

pub use error::CaptureError;
pub use host::{CaptureConnector, CaptureHost, CaptureLease};
pub use mock::MockCaptureProcess;

// =============================================================================
// Signals
// =============================================================================

/// One observation of the capture process.
///
/// Duration and capture flags travel together in a single snapshot so an
/// observer can never see a duration tick reordered against a flag change.
/// `seq` increases by one with every published snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSignals {
    pub seq: u64,
    /// The process is running and reachable.
    pub alive: bool,
    /// The microphone is actively being captured.
    pub capturing: bool,
    /// The process acknowledged a pause request.
    pub paused: bool,
    /// An unfinished recording exists (capturing or paused).
    pub has_recording: bool,
    /// Captured audio length of the current recording.
    pub duration_ms: u64,
}

impl CaptureSignals {
    /// Snapshot of a live process with no recording.
    pub fn idle() -> Self {
        Self {
            alive: true,
            ..Self::default()
        }
    }

    /// Snapshot published when the process is unreachable.
    pub fn disconnected(seq: u64) -> Self {
        Self {
            seq,
            ..Self::default()
        }
    }
}

/// What the capture process hands back when a recording is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    pub file_path: PathBuf,
    pub duration_ms: u64,
}

// =============================================================================
// Trait
// =============================================================================

/// The background unit that owns the physical microphone.
///
/// Implementations write audio for the current recording to the path given to
/// `start` and publish every state change on the signals channel.
#[async_trait]
pub trait AudioCaptureProcess: Send + Sync {
    /// Begin a new recording written to `file_path`.
    async fn start(&self, file_path: &Path) -> Result<(), CaptureError>;

    /// Stop capturing without finalizing the recording.
    async fn pause(&self) -> Result<(), CaptureError>;

    /// Continue capturing into the paused recording.
    async fn resume(&self) -> Result<(), CaptureError>;

    /// Finalize the current recording.
    async fn stop(&self) -> Result<CaptureSummary, CaptureError>;

    /// Audio file of the unfinished recording, if the process knows it.
    ///
    /// Lets a newly attached session take over a recording started elsewhere.
    fn current_file(&self) -> Option<PathBuf> {
        None
    }

    /// Subscribe to state snapshots. The receiver always yields the latest one.
    fn signals(&self) -> watch::Receiver<CaptureSignals>;

    /// Whether the process is currently reachable.
    fn is_alive(&self) -> bool {
        self.signals().borrow().alive
    }
}
