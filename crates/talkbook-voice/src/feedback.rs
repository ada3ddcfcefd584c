//! Spoken feedback for voice commands.
//!
//! `speak` never blocks the caller. Messages go through a bounded queue to a
//! worker that speaks them one after another, so a new message never cuts
//! off the one being spoken. When the queue is full the new message is
//! dropped with a warning.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use talkbook_core::config::VoiceConfig;

/// Something that can say a message out loud.
#[async_trait]
pub trait SpeechSink: Send + Sync {
    /// Speak `message`, returning once it has been spoken.
    async fn speak(&self, message: &str);
}

/// Speech sink that writes messages to the log.
#[derive(Debug, Clone, Default)]
pub struct LogSpeechSink;

#[async_trait]
impl SpeechSink for LogSpeechSink {
    async fn speak(&self, message: &str) {
        tracing::info!(text = message, "Voice feedback");
    }
}

/// Queue of messages waiting to be spoken. Clones share the queue.
#[derive(Debug, Clone)]
pub struct VoiceFeedbackChannel {
    tx: mpsc::Sender<String>,
}

impl VoiceFeedbackChannel {
    /// Spawn the speaking worker on the current tokio runtime.
    pub fn new(sink: Arc<dyn SpeechSink>, capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<String>(capacity.max(1));
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                sink.speak(&message).await;
            }
            tracing::debug!("Voice feedback worker stopped");
        });
        Self { tx }
    }

    /// Build a channel from `config`, or `None` when feedback is disabled.
    pub fn from_config(config: &VoiceConfig, sink: Arc<dyn SpeechSink>) -> Option<Self> {
        config
            .feedback_enabled
            .then(|| Self::new(sink, config.feedback_queue_capacity))
    }

    /// Queue `message` for speaking. Returns `false` if it was dropped.
    pub fn speak(&self, message: impl Into<String>) -> bool {
        match self.tx.try_send(message.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                tracing::warn!(text = %message, "Voice feedback queue full, dropping message");
                false
            }
            Err(TrySendError::Closed(message)) => {
                tracing::warn!(text = %message, "Voice feedback worker gone, dropping message");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Records spoken messages; each utterance waits for a permit.
    struct GatedSink {
        spoken: Mutex<Vec<String>>,
        gate: Semaphore,
    }

    impl GatedSink {
        fn new(permits: usize) -> Self {
            Self {
                spoken: Mutex::new(Vec::new()),
                gate: Semaphore::new(permits),
            }
        }

        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechSink for GatedSink {
        async fn speak(&self, message: &str) {
            let permit = self.gate.acquire().await.unwrap();
            permit.forget();
            self.spoken.lock().unwrap().push(message.to_string());
        }
    }

    #[tokio::test]
    async fn test_messages_are_spoken_in_order() {
        let sink = Arc::new(GatedSink::new(100));
        let channel = VoiceFeedbackChannel::new(sink.clone(), 8);

        assert!(channel.speak("一"));
        assert!(channel.speak("二"));
        assert!(channel.speak("三"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(sink.spoken(), vec!["一", "二", "三"]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_new_messages() {
        let sink = Arc::new(GatedSink::new(0));
        let channel = VoiceFeedbackChannel::new(sink.clone(), 1);

        assert!(channel.speak("first"));
        // Let the worker take "first" and block in the sink.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(channel.speak("second"));
        assert!(!channel.speak("third"));

        sink.gate.add_permits(10);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(sink.spoken(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_disabled_config_yields_no_channel() {
        let config = VoiceConfig {
            feedback_enabled: false,
            ..VoiceConfig::default()
        };
        assert!(VoiceFeedbackChannel::from_config(&config, Arc::new(LogSpeechSink)).is_none());
        assert!(
            VoiceFeedbackChannel::from_config(&VoiceConfig::default(), Arc::new(LogSpeechSink))
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let channel = VoiceFeedbackChannel::new(Arc::new(LogSpeechSink), 0);
        assert!(channel.speak("ok"));
    }
}
