//! Domain store for tracked files.
//!
//! Besides the usual write-through CRUD, the file mirror has one extra
//! mode: a preview window scopes it to an explicit id list via
//! [`fetch_by_ids`](FileStore::fetch_by_ids), so the same store type
//! serves both the full library and a handful of files under preview.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::backend::EntityStore;
use crate::entity::{FileId, FileRecord, TagId, TagRecord};
use crate::error::StorageError;
use crate::observe::ObservableList;
use crate::tags::TagStore;

/// Write-through controller and observable mirror for files.
pub struct FileStore {
    backend: Arc<dyn EntityStore>,
    file_list: ObservableList<FileRecord>,
}

impl FileStore {
    /// Create a store over the given backend with an empty mirror.
    pub fn new(backend: Arc<dyn EntityStore>) -> Self {
        Self {
            backend,
            file_list: ObservableList::new(),
        }
    }

    /// The observable file mirror.
    pub fn file_list(&self) -> &ObservableList<FileRecord> {
        &self.file_list
    }

    /// Replace the mirror with the full durable snapshot.
    pub async fn fetch_all(&self) -> Result<(), StorageError> {
        let files = self.backend.fetch_files().await?;
        tracing::debug!(count = files.len(), "file mirror refreshed");
        self.file_list.replace_all(files);
        Ok(())
    }

    /// Scope the mirror to exactly the given ids, in the given order.
    ///
    /// Ids with no durable record are skipped. This is how a preview
    /// window shows a pushed subset instead of the whole library.
    pub async fn fetch_by_ids(&self, ids: Vec<FileId>) -> Result<(), StorageError> {
        let requested = ids.len();
        let files = self.backend.fetch_files_by_ids(ids).await?;
        if files.len() != requested {
            tracing::warn!(
                requested,
                found = files.len(),
                "some requested files have no record"
            );
        }
        self.file_list.replace_all(files);
        Ok(())
    }

    /// Mirror-only lookup by id.
    pub fn get(&self, id: &FileId) -> Option<FileRecord> {
        self.file_list.find(|f| &f.id == id)
    }

    /// Mirror-only lookup by exact path.
    pub fn find_by_path(&self, path: &Path) -> Option<FileRecord> {
        self.file_list.find(|f| f.path == path)
    }

    /// Import a file: create the durable record, then mirror it.
    pub async fn add_file(
        &self,
        path: impl Into<std::path::PathBuf>,
        date_added: DateTime<Utc>,
    ) -> Result<FileRecord, StorageError> {
        let file = self
            .backend
            .create_file(FileRecord::new(path, date_added))
            .await?;
        tracing::info!(file = %file.id, path = %file.path.display(), "file imported");
        self.file_list.push(file.clone());
        Ok(file)
    }

    /// Record that a file moved on disk.
    pub async fn set_path(
        &self,
        id: &FileId,
        path: impl Into<std::path::PathBuf>,
    ) -> Result<FileRecord, StorageError> {
        let mut record = self.get(id).ok_or_else(|| StorageError::Missing {
            kind: "file",
            id: id.to_string(),
        })?;
        record.path = path.into();
        let stored = self.backend.update_file(record).await?;
        self.file_list
            .update_where(|f| &f.id == id, |f| *f = stored.clone());
        Ok(stored)
    }

    /// Remove a file durably, then drop it from the mirror.
    pub async fn remove(&self, id: &FileId) -> Result<(), StorageError> {
        self.backend.remove_file(id.clone()).await?;
        self.file_list.remove_where(|f| &f.id == id);
        Ok(())
    }

    /// Attach a tag to a file. Returns `Ok(false)` without a durable
    /// write when the tag is already attached.
    pub async fn add_tag(&self, file: &FileId, tag: &TagId) -> Result<bool, StorageError> {
        let mut record = self.get(file).ok_or_else(|| StorageError::Missing {
            kind: "file",
            id: file.to_string(),
        })?;
        if !record.attach_tag(tag.clone()) {
            return Ok(false);
        }
        self.backend.update_file(record.clone()).await?;
        self.file_list
            .update_where(|f| f.id == record.id, |f| *f = record.clone());
        Ok(true)
    }

    /// Detach a tag from a file. Returns `Ok(false)` without a durable
    /// write when the tag was not attached.
    pub async fn remove_tag(&self, file: &FileId, tag: &TagId) -> Result<bool, StorageError> {
        let mut record = self.get(file).ok_or_else(|| StorageError::Missing {
            kind: "file",
            id: file.to_string(),
        })?;
        if !record.detach_tag(tag) {
            return Ok(false);
        }
        self.backend.update_file(record.clone()).await?;
        self.file_list
            .update_where(|f| f.id == record.id, |f| *f = record.clone());
        Ok(true)
    }

    /// Empty the mirror without touching durable state. Used when a
    /// preview window closes and its scoped list must not linger.
    pub fn clear_list(&self) {
        self.file_list.clear();
    }

    /// Resolve a file's tag ids against the tag mirror, silently dropping
    /// ids whose tag no longer exists. Dangling ids stay in the record
    /// until the next write rewrites it; readers never see them.
    pub fn resolved_tags(&self, file: &FileRecord, tags: &TagStore) -> Vec<TagRecord> {
        file.tags.iter().filter_map(|id| tags.get(id)).collect()
    }
}
