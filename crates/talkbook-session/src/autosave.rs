//! Debounced chapter auto-save.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use talkbook_core::repository::ChapterRepository;
use talkbook_core::types::ChapterId;

use crate::debounce::Debouncer;

/// Saves chapter edits after a quiet period, one debouncer per chapter.
///
/// At most one save per chapter is in flight; edits arriving during a save
/// replace each other and only the latest is written next.
pub struct AutoSaveScheduler {
    repo: Arc<dyn ChapterRepository>,
    delay: Duration,
    debouncers: Mutex<HashMap<ChapterId, Arc<Debouncer<String>>>>,
}

impl AutoSaveScheduler {
    pub fn new(repo: Arc<dyn ChapterRepository>, delay: Duration) -> Self {
        Self {
            repo,
            delay,
            debouncers: Mutex::new(HashMap::new()),
        }
    }

    fn debouncers(&self) -> MutexGuard<'_, HashMap<ChapterId, Arc<Debouncer<String>>>> {
        self.debouncers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn debouncer_for(&self, chapter: ChapterId) -> Arc<Debouncer<String>> {
        let mut debouncers = self.debouncers();
        let entry = debouncers.entry(chapter).or_insert_with(|| {
            let repo = Arc::clone(&self.repo);
            Arc::new(Debouncer::new(self.delay, move |content: String| {
                let repo = Arc::clone(&repo);
                async move {
                    match repo.update_chapter(chapter, content).await {
                        Ok(saved) => {
                            tracing::debug!(chapter_id = %chapter, bytes = saved.content.len(), "Chapter auto-saved")
                        }
                        Err(e) => tracing::warn!(chapter_id = %chapter, error = %e, "Chapter auto-save failed"),
                    }
                }
            }))
        });
        Arc::clone(entry)
    }

    /// Queue `content` as the latest version of `chapter`.
    pub fn schedule(&self, chapter: ChapterId, content: impl Into<String>) {
        let content = content.into();
        if !self.debouncer_for(chapter).push(content.clone()) {
            // The previous debouncer was shut down; start a fresh one.
            self.debouncers().remove(&chapter);
            self.debouncer_for(chapter).push(content);
        }
    }

    /// Write the pending edit of `chapter` now.
    pub async fn flush(&self, chapter: ChapterId) {
        let debouncer = self.debouncers().get(&chapter).cloned();
        if let Some(debouncer) = debouncer {
            debouncer.flush().await;
        }
    }

    /// Write every pending edit.
    pub async fn flush_all(&self) {
        let debouncers: Vec<_> = self.debouncers().values().cloned().collect();
        for debouncer in debouncers {
            debouncer.flush().await;
        }
    }

    /// Write the pending edit of `chapter` and release its worker.
    ///
    /// Call when a chapter is closed; a later `schedule` starts a new worker.
    pub async fn forget(&self, chapter: ChapterId) {
        let debouncer = self.debouncers().remove(&chapter);
        if let Some(debouncer) = debouncer {
            debouncer.close().await;
            tracing::debug!(chapter_id = %chapter, "Auto-save released chapter");
        }
    }

    /// Write every pending edit and stop all workers.
    pub async fn shutdown(&self) {
        let debouncers: Vec<_> = self.debouncers().drain().map(|(_, d)| d).collect();
        let count = debouncers.len();
        for debouncer in debouncers {
            debouncer.close().await;
        }
        tracing::info!(chapters = count, "Auto-save stopped");
    }

    /// Number of chapters with a live debouncer.
    pub fn tracked_chapters(&self) -> usize {
        self.debouncers().len()
    }
}
