//! The root aggregator: one object owning every domain store of a window.

use std::sync::Arc;

use crate::backend::EntityStore;
use crate::collections::TagCollectionStore;
use crate::entity::{TagId, TagRecord};
use crate::error::{StorageError, StoreError};
use crate::files::FileStore;
use crate::resolve::TagResolver;
use crate::tags::TagStore;
use crate::ui::UiStore;

/// What [`RootStore::init`] loads beyond the always-loaded tag and
/// collection mirrors.
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    /// Load the full file mirror. Preview windows skip this; their file
    /// list arrives as a pushed id subset instead.
    pub load_files: bool,
    /// Recover persisted UI preferences.
    pub load_preferences: bool,
}

impl InitOptions {
    /// Full startup for a main window.
    pub fn main_window() -> Self {
        Self {
            load_files: true,
            load_preferences: true,
        }
    }

    /// Minimal startup for a preview window.
    pub fn preview_window() -> Self {
        Self {
            load_files: false,
            load_preferences: false,
        }
    }
}

/// Aggregates the durable backend, the three entity stores, and the UI
/// store behind one handle. Every store is `Arc`-shared so handlers and
/// spawned tasks can hold pieces independently.
pub struct RootStore {
    backend: Arc<dyn EntityStore>,
    files: Arc<FileStore>,
    tags: Arc<TagStore>,
    collections: Arc<TagCollectionStore>,
    ui: Arc<UiStore>,
}

impl RootStore {
    /// Assemble the store graph over a backend, with the given UI store.
    pub fn new(backend: Arc<dyn EntityStore>, ui: UiStore) -> Self {
        Self {
            files: Arc::new(FileStore::new(backend.clone())),
            tags: Arc::new(TagStore::new(backend.clone())),
            collections: Arc::new(TagCollectionStore::new(backend.clone())),
            ui: Arc::new(ui),
            backend,
        }
    }

    /// The file store.
    pub fn files(&self) -> &Arc<FileStore> {
        &self.files
    }

    /// The tag store.
    pub fn tags(&self) -> &Arc<TagStore> {
        &self.tags
    }

    /// The collection store.
    pub fn collections(&self) -> &Arc<TagCollectionStore> {
        &self.collections
    }

    /// The UI store.
    pub fn ui(&self) -> &Arc<UiStore> {
        &self.ui
    }

    /// A resolver over this store graph.
    pub fn resolver(&self) -> TagResolver {
        TagResolver::new(self.tags.clone(), self.collections.clone())
    }

    /// Bring the whole graph to a usable state, in dependency order:
    /// backend first, then the tag and collection mirrors (creating the
    /// root collection if needed), then optionally files and preferences.
    ///
    /// Any failure aborts the sequence; already-loaded mirrors keep their
    /// contents and the caller decides whether to retry or give up.
    pub async fn init(&self, opts: InitOptions) -> Result<(), StoreError> {
        self.backend.init().await.map_err(StoreError::Storage)?;
        self.tags.fetch_all().await?;
        self.collections.fetch_all().await?;
        if opts.load_files {
            self.files.fetch_all().await?;
        }
        if opts.load_preferences {
            self.ui.recover_persistent_preferences()?;
        }
        tracing::info!(
            load_files = opts.load_files,
            load_preferences = opts.load_preferences,
            "root store initialized"
        );
        Ok(())
    }

    /// Fetch the durable tag table directly, bypassing the mirror. Used
    /// to answer cross-process tag queries with authoritative state.
    pub async fn fetch_tags_direct(&self) -> Result<Vec<TagRecord>, StorageError> {
        self.backend.fetch_tags().await
    }

    /// Delete a tag: detach it from every collection, then remove the
    /// record. File records keep the dangling id; readers filter it.
    pub async fn delete_tag(&self, id: &TagId) -> Result<(), StorageError> {
        self.collections.detach_tag_everywhere(id).await?;
        self.tags.remove(id).await
    }
}
