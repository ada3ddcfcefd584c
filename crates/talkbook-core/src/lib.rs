//! Talkbook core crate - shared data model, configuration, events and the
//! narrow persistence contract used by the recording and voice-command crates.

pub mod config;
pub mod error;
pub mod events;
pub mod repository;
pub mod types;

pub use config::TalkbookConfig;
pub use error::{Result, TalkbookError};
pub use events::SessionEvent;
pub use repository::{ChapterRepository, InMemoryChapterRepository};
pub use types::*;
