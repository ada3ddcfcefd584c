//! Talkbook demo binary - composition root.
//!
//! Ties the Talkbook crates together into a line-driven console app:
//! 1. Load configuration from TOML
//! 2. Start a simulated capture process and bind a recording session to it
//! 3. Wire the voice command dispatcher to the session and a demo screen
//! 4. Read utterances from stdin, printing results and session events as JSON

mod cli;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use talkbook_capture::{CaptureHost, MockCaptureProcess};
use talkbook_core::config::TalkbookConfig;
use talkbook_core::events::SessionEvent;
use talkbook_core::repository::{ChapterRepository, InMemoryChapterRepository};
use talkbook_core::types::{Chapter, ChapterId, DocumentId, Recording};
use talkbook_session::{
    transcribe_recording, AutoSaveScheduler, MockTranscription, RecordingSessionController,
    SharedPermission,
};
use talkbook_voice::{
    CommandDispatcher, Destination, DocumentSaver, LogSpeechSink, Navigator, ReadAloudSink,
    ScreenCapabilities, VoiceFeedbackChannel,
};

use cli::CliArgs;

/// Screen stack that only logs where it goes.
struct ConsoleNavigator {
    stack: Mutex<Vec<Destination>>,
}

impl ConsoleNavigator {
    fn new() -> Self {
        Self {
            stack: Mutex::new(vec![Destination::Home]),
        }
    }
}

impl Navigator for ConsoleNavigator {
    fn go_back(&self) -> bool {
        let Ok(mut stack) = self.stack.lock() else {
            return false;
        };
        if stack.len() <= 1 {
            return false;
        }
        stack.pop();
        tracing::info!(screen = ?stack.last(), "Navigated back");
        true
    }

    fn navigate_to(&self, destination: &Destination) -> bool {
        let Ok(mut stack) = self.stack.lock() else {
            return false;
        };
        if stack.last() != Some(destination) {
            stack.push(*destination);
        }
        tracing::info!(screen = %destination, "Navigated");
        true
    }
}

/// Reads the open chapter aloud through the log.
struct ConsoleReader {
    repo: Arc<InMemoryChapterRepository>,
    chapter: ChapterId,
}

impl ReadAloudSink for ConsoleReader {
    fn read_aloud(&self) -> Result<(), String> {
        let chapter = self.repo.get(self.chapter).map_err(|e| e.to_string())?;
        if chapter.content.is_empty() {
            return Err("読み上げる内容がありません".to_string());
        }
        tracing::info!(chapter = %chapter.title, text = %chapter.content, "Reading aloud");
        Ok(())
    }
}

/// Saves the open chapter by flushing its pending auto-save.
struct AutoSaveSaver {
    autosave: Arc<AutoSaveScheduler>,
    chapter: ChapterId,
}

#[async_trait]
impl DocumentSaver for AutoSaveSaver {
    async fn save(&self) -> Result<(), String> {
        self.autosave.flush(self.chapter).await;
        Ok(())
    }
}

/// Expand ~ to home directory in a path string.
fn resolve_dir(dir: &str) -> PathBuf {
    if dir.starts_with("~/") || dir.starts_with("~\\") {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(&dir[2..])
    } else {
        PathBuf::from(dir)
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize output"),
    }
}

/// Print session events and transcribe each finalized recording.
async fn event_loop(
    controller: RecordingSessionController,
    recordings_dir: PathBuf,
    transcriber: Arc<MockTranscription>,
) {
    let mut events = controller.subscribe_events();
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Event printer lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };
        print_json(&event);

        if let SessionEvent::RecordingStopped {
            recording_id,
            duration_ms,
            ..
        } = event
        {
            let mut recording = Recording {
                id: recording_id,
                duration_ms,
                ..Recording::new(recordings_dir.join(format!("{}.wav", recording_id)))
            };
            if transcribe_recording(transcriber.as_ref(), &mut recording).await.is_ok() {
                print_json(&recording);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = TalkbookConfig::load_or_default(&config_file);
    config.general.data_dir = resolve_dir(&config.general.data_dir)
        .to_string_lossy()
        .to_string();
    config.recording.recordings_dir = resolve_dir(&config.recording.recordings_dir)
        .to_string_lossy()
        .to_string();
    config.recording.recordings_dir = config.recordings_path().to_string_lossy().to_string();

    // Tracing. Logs go to stderr so stdout stays JSON.
    let log_level = args.resolve_log_level(&config.general.log_level);
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .init();

    tracing::info!("Starting Talkbook v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = %config_file.display(),
        data_dir = %config.general.data_dir,
        recordings_dir = %config.recording.recordings_dir,
        "Configuration loaded"
    );

    // Capture process.
    let process = MockCaptureProcess::new();
    let ticker = process.spawn_ticker(config.recording.tick_interval());
    let host = CaptureHost::new(Arc::new(process.clone()));

    // Recording session.
    let permission = SharedPermission::new(!args.deny_permission);
    let controller = RecordingSessionController::from_connector(
        Arc::new(host),
        Arc::new(permission),
        &config.recording,
    );
    if let Err(e) = controller.connect().await {
        tracing::error!(error = %e, "Capture process unavailable");
        return Err(e.into());
    }

    // Document being dictated into.
    let repo = Arc::new(InMemoryChapterRepository::new());
    let chapter = repo
        .create_chapter(Chapter::new(DocumentId::new(), "第1章"))
        .await?;
    let autosave = Arc::new(AutoSaveScheduler::new(
        repo.clone(),
        config.autosave.debounce(),
    ));

    // Voice commands.
    let caps = ScreenCapabilities::new()
        .with_navigator(Arc::new(ConsoleNavigator::new()))
        .with_recorder(controller.clone())
        .with_reader(Arc::new(ConsoleReader {
            repo: repo.clone(),
            chapter: chapter.id,
        }))
        .with_saver(Arc::new(AutoSaveSaver {
            autosave: autosave.clone(),
            chapter: chapter.id,
        }));
    let mut dispatcher = CommandDispatcher::new();
    if let Some(feedback) = VoiceFeedbackChannel::from_config(&config.voice, Arc::new(LogSpeechSink)) {
        dispatcher = dispatcher.with_feedback(feedback);
    }

    let events = tokio::spawn(event_loop(
        controller.clone(),
        config.recording.recordings_path(),
        Arc::new(MockTranscription::default()),
    ));

    // Input loop.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut draft = String::new();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(text) = line.strip_prefix('>') {
            draft.push_str(text.trim());
            autosave.schedule(chapter.id, draft.clone());
            continue;
        }
        if !config.voice.enabled {
            tracing::debug!(text = %line, "Voice commands disabled, ignoring input");
            continue;
        }
        let result = dispatcher.handle_utterance(line, &caps).await;
        print_json(&result);
    }

    // Shutdown.
    tracing::info!("Shutting down");
    autosave.shutdown().await;
    controller.close().await;
    ticker.abort();
    events.abort();
    Ok(())
}
