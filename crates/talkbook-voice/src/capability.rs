//! What the current screen lets a voice command do.
//!
//! A screen hands the dispatcher a `ScreenCapabilities` value listing the
//! collaborators it supports. A command whose collaborator is missing fails
//! with a "not available here" message instead of reaching for a global.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use talkbook_session::RecordingSessionController;

use crate::types::Destination;

/// Screen navigation. Returns `false` when the move is not possible here.
pub trait Navigator: Send + Sync {
    fn go_back(&self) -> bool;
    fn navigate_to(&self, destination: &Destination) -> bool;
}

/// Reads the current document aloud.
pub trait ReadAloudSink: Send + Sync {
    fn read_aloud(&self) -> Result<(), String>;
}

/// Persists the document shown on the current screen.
#[async_trait]
pub trait DocumentSaver: Send + Sync {
    async fn save(&self) -> Result<(), String>;
}

/// A collaborator a command may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Navigation,
    Recording,
    ReadAloud,
    Save,
}

impl Capability {
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Navigation => "画面移動",
            Capability::Recording => "録音",
            Capability::ReadAloud => "読み上げ",
            Capability::Save => "保存",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Navigation => write!(f, "navigation"),
            Capability::Recording => write!(f, "recording"),
            Capability::ReadAloud => write!(f, "read_aloud"),
            Capability::Save => write!(f, "save"),
        }
    }
}

/// Collaborators available on the active screen.
#[derive(Clone, Default)]
pub struct ScreenCapabilities {
    navigator: Option<Arc<dyn Navigator>>,
    recorder: Option<RecordingSessionController>,
    reader: Option<Arc<dyn ReadAloudSink>>,
    saver: Option<Arc<dyn DocumentSaver>>,
}

impl fmt::Debug for ScreenCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenCapabilities")
            .field("navigator", &self.navigator.is_some())
            .field("recorder", &self.recorder.is_some())
            .field("reader", &self.reader.is_some())
            .field("saver", &self.saver.is_some())
            .finish()
    }
}

impl ScreenCapabilities {
    /// A screen that supports nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn with_recorder(mut self, recorder: RecordingSessionController) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn with_reader(mut self, reader: Arc<dyn ReadAloudSink>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn with_saver(mut self, saver: Arc<dyn DocumentSaver>) -> Self {
        self.saver = Some(saver);
        self
    }

    pub fn navigator(&self) -> Option<&dyn Navigator> {
        self.navigator.as_deref()
    }

    pub fn recorder(&self) -> Option<&RecordingSessionController> {
        self.recorder.as_ref()
    }

    pub fn reader(&self) -> Option<&dyn ReadAloudSink> {
        self.reader.as_deref()
    }

    pub fn saver(&self) -> Option<&dyn DocumentSaver> {
        self.saver.as_deref()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Navigation => self.navigator.is_some(),
            Capability::Recording => self.recorder.is_some(),
            Capability::ReadAloud => self.reader.is_some(),
            Capability::Save => self.saver.is_some(),
        }
    }
}
