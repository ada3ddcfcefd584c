//! Narrow persistence contract for chapters.
//!
//! The recording core never knows the persistence format; it only creates,
//! updates, deletes and lists chapters through `ChapterRepository`.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Result, TalkbookError};
use crate::types::{Chapter, ChapterId, DocumentId};

/// Chapter persistence used by the auto-save path.
#[async_trait]
pub trait ChapterRepository: Send + Sync {
    async fn create_chapter(&self, chapter: Chapter) -> Result<Chapter>;

    /// Replace the stored content of an existing chapter.
    async fn update_chapter(&self, id: ChapterId, content: String) -> Result<Chapter>;

    async fn delete_chapter(&self, id: ChapterId) -> Result<()>;

    /// All chapters of a document, in creation order.
    async fn get_chapters_by_document(&self, document_id: DocumentId) -> Result<Vec<Chapter>>;
}

/// In-memory chapter store with the same contract as the real repository.
#[derive(Default)]
pub struct InMemoryChapterRepository {
    chapters: Mutex<Vec<Chapter>>,
}

impl InMemoryChapterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Chapter>>> {
        self.chapters
            .lock()
            .map_err(|e| TalkbookError::Persistence(format!("Lock poisoned: {}", e)))
    }

    /// Fetch one chapter by id.
    pub fn get(&self, id: ChapterId) -> Result<Chapter> {
        self.lock()?
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| TalkbookError::NotFound(format!("chapter {}", id)))
    }
}

#[async_trait]
impl ChapterRepository for InMemoryChapterRepository {
    async fn create_chapter(&self, chapter: Chapter) -> Result<Chapter> {
        let mut chapters = self.lock()?;
        if chapters.iter().any(|c| c.id == chapter.id) {
            return Err(TalkbookError::Persistence(format!(
                "chapter {} already exists",
                chapter.id
            )));
        }
        chapters.push(chapter.clone());
        Ok(chapter)
    }

    async fn update_chapter(&self, id: ChapterId, content: String) -> Result<Chapter> {
        let mut chapters = self.lock()?;
        let chapter = chapters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| TalkbookError::NotFound(format!("chapter {}", id)))?;
        chapter.content = content;
        chapter.updated_at = Utc::now();
        Ok(chapter.clone())
    }

    async fn delete_chapter(&self, id: ChapterId) -> Result<()> {
        let mut chapters = self.lock()?;
        let before = chapters.len();
        chapters.retain(|c| c.id != id);
        if chapters.len() == before {
            return Err(TalkbookError::NotFound(format!("chapter {}", id)));
        }
        Ok(())
    }

    async fn get_chapters_by_document(&self, document_id: DocumentId) -> Result<Vec<Chapter>> {
        Ok(self
            .lock()?
            .iter()
            .filter(|c| c.document_id == document_id)
            .cloned()
            .collect())
    }
}
