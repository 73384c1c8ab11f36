use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

use crate::models::{Page, PageRequest};
use crate::record::{EMPTY_ID, EntityRecord, RecordId};

/// Persistence collaborator for one entity type
///
/// `find_all` only returns live (not soft-deleted) rows, and its total
/// count covers the same rows, so pages and totals always agree.
#[async_trait]
pub trait Repository<E: EntityRecord>: Send + Sync {
    async fn find_by_id(&self, id: RecordId) -> Result<Option<E>>;

    /// One page of live rows ordered by id ascending
    async fn find_all(&self, request: &PageRequest) -> Result<Page<E>>;

    /// Insert or replace. An entity with an empty id gets a fresh one.
    async fn save(&self, entity: E) -> Result<E>;

    /// Remove a row permanently. Removing a missing row is not an error.
    async fn delete(&self, id: RecordId) -> Result<()>;

    async fn health_check(&self) -> Result<()>;
}

/// Process-local repository backed by an ordered map
pub struct MemoryRepository<E> {
    rows: RwLock<BTreeMap<RecordId, E>>,
    next_id: AtomicI64,
}

impl<E> MemoryRepository<E> {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<E> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: EntityRecord> Repository<E> for MemoryRepository<E> {
    async fn find_by_id(&self, id: RecordId) -> Result<Option<E>> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn find_all(&self, request: &PageRequest) -> Result<Page<E>> {
        let rows = self.rows.read().await;
        let live = rows.values().filter(|row| !row.is_deleted());

        let total_elements = live.clone().count() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let content: Vec<E> = live
            .skip(offset)
            .take(request.size() as usize)
            .cloned()
            .collect();

        tracing::debug!(
            "Listed {} rows (total: {}, page: {}, size: {})",
            content.len(),
            total_elements,
            request.page(),
            request.size()
        );

        Ok(Page {
            content,
            request: *request,
            total_elements,
        })
    }

    async fn save(&self, mut entity: E) -> Result<E> {
        if entity.id() == EMPTY_ID {
            entity.set_id(self.next_id.fetch_add(1, Ordering::SeqCst));
        } else {
            // Keep the sequence ahead of explicitly supplied ids.
            self.next_id.fetch_max(entity.id() + 1, Ordering::SeqCst);
        }

        self.rows.write().await.insert(entity.id(), entity.clone());
        tracing::debug!("Saved row with id: {}", entity.id());
        Ok(entity)
    }

    async fn delete(&self, id: RecordId) -> Result<()> {
        if self.rows.write().await.remove(&id).is_some() {
            tracing::debug!("Deleted row with id: {}", id);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SoftDelete;
    use chrono::Utc;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: RecordId,
        text: String,
        marker: SoftDelete,
    }

    impl Note {
        fn new(text: &str) -> Self {
            Note {
                id: EMPTY_ID,
                text: text.to_string(),
                marker: SoftDelete::default(),
            }
        }
    }

    impl EntityRecord for Note {
        fn id(&self) -> RecordId {
            self.id
        }

        fn set_id(&mut self, id: RecordId) {
            self.id = id;
        }

        fn soft_delete(&self) -> &SoftDelete {
            &self.marker
        }

        fn soft_delete_mut(&mut self) -> &mut SoftDelete {
            &mut self.marker
        }
    }

    fn page(page: u32, size: u32) -> PageRequest {
        PageRequest::new(page, size, 100).unwrap()
    }

    #[tokio::test]
    async fn test_save_assigns_sequential_ids() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();

        let first = repo.save(Note::new("a")).await.unwrap();
        let second = repo.save(Note::new("b")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
    }

    #[tokio::test]
    async fn test_save_with_id_replaces_row() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        let mut saved = repo.save(Note::new("before")).await.unwrap();

        saved.text = "after".to_string();
        repo.save(saved.clone()).await.unwrap();

        let found = repo.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(found.text, "after");
    }

    #[tokio::test]
    async fn test_explicit_id_advances_sequence() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        let mut note = Note::new("explicit");
        note.id = 10;
        repo.save(note).await.unwrap();

        let next = repo.save(Note::new("next")).await.unwrap();
        assert_eq!(next.id, 11);
    }

    #[tokio::test]
    async fn test_find_by_id_missing() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        assert!(repo.find_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_all_pages_in_id_order() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        for i in 0..15 {
            repo.save(Note::new(&format!("note-{}", i))).await.unwrap();
        }

        let first = repo.find_all(&page(0, 10)).await.unwrap();
        assert_eq!(first.content.len(), 10);
        assert_eq!(first.total_elements, 15);
        assert_eq!(first.total_pages(), 2);
        assert_eq!(first.content[0].id, 1);

        let second = repo.find_all(&page(1, 10)).await.unwrap();
        assert_eq!(second.content.len(), 5);
        assert_eq!(second.content[0].id, 11);

        let beyond = repo.find_all(&page(5, 10)).await.unwrap();
        assert!(beyond.content.is_empty());
        assert_eq!(beyond.total_elements, 15);
    }

    #[tokio::test]
    async fn test_find_all_excludes_soft_deleted_from_rows_and_count() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        let kept = repo.save(Note::new("kept")).await.unwrap();
        let mut hidden = repo.save(Note::new("hidden")).await.unwrap();

        hidden.marker.mark(Utc::now());
        repo.save(hidden.clone()).await.unwrap();

        let result = repo.find_all(&page(0, 10)).await.unwrap();
        assert_eq!(result.content, vec![kept]);
        assert_eq!(result.total_elements, 1);

        // Still reachable by id
        assert!(repo.find_by_id(hidden.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let repo: MemoryRepository<Note> = MemoryRepository::new();
        let saved = repo.save(Note::new("gone")).await.unwrap();

        repo.delete(saved.id).await.unwrap();
        assert!(repo.find_by_id(saved.id).await.unwrap().is_none());

        // Deleting again is a no-op
        repo.delete(saved.id).await.unwrap();
    }

    #[test]
    fn test_repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemoryRepository<Note>>();
    }
}
