//! Domain store for tags: write-through controller plus in-memory mirror.

use std::sync::Arc;

use crate::backend::EntityStore;
use crate::entity::{TagId, TagRecord};
use crate::error::StorageError;
use crate::observe::ObservableList;

/// Owns the tag mirror and routes all tag mutations through the durable
/// store first.
///
/// Name uniqueness is deliberately not enforced here: callers that want
/// one tag per name go through the resolution service, and even that is
/// a policy with a documented race, not a constraint.
pub struct TagStore {
    backend: Arc<dyn EntityStore>,
    tag_list: ObservableList<TagRecord>,
}

impl TagStore {
    /// Create a store over the given backend with an empty mirror.
    pub fn new(backend: Arc<dyn EntityStore>) -> Self {
        Self {
            backend,
            tag_list: ObservableList::new(),
        }
    }

    /// The observable tag mirror. Read and subscribe freely; mutate only
    /// through this store.
    pub fn tag_list(&self) -> &ObservableList<TagRecord> {
        &self.tag_list
    }

    /// Replace the mirror with a fresh durable snapshot. Idempotent;
    /// safe to call repeatedly as a refresh.
    pub async fn fetch_all(&self) -> Result<(), StorageError> {
        let tags = self.backend.fetch_tags().await?;
        tracing::debug!(count = tags.len(), "tag mirror refreshed");
        self.tag_list.replace_all(tags);
        Ok(())
    }

    /// Mirror-only lookup by id.
    pub fn get(&self, id: &TagId) -> Option<TagRecord> {
        self.tag_list.find(|t| &t.id == id)
    }

    /// Mirror-only lookup by exact name. First match wins when
    /// duplicates exist.
    pub fn find_by_name(&self, name: &str) -> Option<TagRecord> {
        self.tag_list.find(|t| t.name == name)
    }

    /// Create a tag durably, then mirror it. The caller observes success
    /// only after both writes land; on durable failure the mirror is
    /// untouched.
    pub async fn add_tag(&self, name: &str) -> Result<TagRecord, StorageError> {
        let tag = self.backend.create_tag(TagRecord::new(name)).await?;
        tracing::info!(tag = %tag.id, name = %tag.name, "tag created");
        self.tag_list.push(tag.clone());
        Ok(tag)
    }

    /// Rename a tag. Same write-through shape as the other mutations.
    pub async fn rename(&self, id: &TagId, name: &str) -> Result<TagRecord, StorageError> {
        let mut record = self.get(id).ok_or_else(|| StorageError::Missing {
            kind: "tag",
            id: id.to_string(),
        })?;
        record.name = name.to_owned();
        let stored = self.backend.update_tag(record).await?;
        self.tag_list
            .update_where(|t| &t.id == id, |t| *t = stored.clone());
        Ok(stored)
    }

    /// Remove a tag durably, then drop it from the mirror.
    ///
    /// File records referencing the tag are not rewritten; readers
    /// tolerate the dangling id. Collection detachment is the
    /// responsibility of [`TagCollectionStore`](crate::TagCollectionStore).
    pub async fn remove(&self, id: &TagId) -> Result<(), StorageError> {
        self.backend.remove_tag(id.clone()).await?;
        self.tag_list.remove_where(|t| &t.id == id);
        Ok(())
    }
}
