//! Domain store for tag collections, the tree that groups tags.
//!
//! The root collection is special: it always exists after
//! [`fetch_all`](TagCollectionStore::fetch_all) and every freshly created
//! tag is attached to it by the resolution service so it is reachable
//! from the tree.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backend::EntityStore;
use crate::entity::{CollectionId, CollectionRecord, TagId};
use crate::error::StorageError;
use crate::observe::ObservableList;

/// Write-through controller and observable mirror for collections.
///
/// Every mutation is a read-modify-write of one collection record, so
/// mutations are serialized through an internal async mutex: without it,
/// two concurrent attaches to the same collection would each rewrite the
/// record from their own stale snapshot and the last durable write would
/// drop the other's change.
pub struct TagCollectionStore {
    backend: Arc<dyn EntityStore>,
    collection_list: ObservableList<CollectionRecord>,
    write_gate: Mutex<()>,
}

impl TagCollectionStore {
    /// Create a store over the given backend with an empty mirror.
    pub fn new(backend: Arc<dyn EntityStore>) -> Self {
        Self {
            backend,
            collection_list: ObservableList::new(),
            write_gate: Mutex::new(()),
        }
    }

    /// The observable collection mirror.
    pub fn collection_list(&self) -> &ObservableList<CollectionRecord> {
        &self.collection_list
    }

    /// Load the durable snapshot into the mirror, creating the root
    /// collection durably if it does not exist yet (first run).
    pub async fn fetch_all(&self) -> Result<(), StorageError> {
        let mut collections = self.backend.fetch_collections().await?;
        if !collections.iter().any(|c| c.id.is_root()) {
            let root = self.backend.create_collection(CollectionRecord::root()).await?;
            tracing::info!("root collection created");
            collections.push(root);
        }
        tracing::debug!(count = collections.len(), "collection mirror refreshed");
        self.collection_list.replace_all(collections);
        Ok(())
    }

    /// Mirror-only lookup by id.
    pub fn get(&self, id: &CollectionId) -> Option<CollectionRecord> {
        self.collection_list.find(|c| &c.id == id)
    }

    /// The root collection. `None` only before `fetch_all` has run.
    pub fn get_root(&self) -> Option<CollectionRecord> {
        self.collection_list.find(|c| c.id.is_root())
    }

    /// Create a collection durably and link it under `parent`.
    ///
    /// The child is created first, then the parent's subcollection list
    /// is rewritten. If the parent rewrite fails the child exists durably
    /// but unlinked; the error is surfaced and the mirror gains neither.
    pub async fn add_collection(
        &self,
        name: &str,
        parent: &CollectionId,
    ) -> Result<CollectionRecord, StorageError> {
        let _gate = self.write_gate.lock().await;
        let mut parent_record = self.get(parent).ok_or_else(|| StorageError::Missing {
            kind: "collection",
            id: parent.to_string(),
        })?;

        let child = self
            .backend
            .create_collection(CollectionRecord::new(name))
            .await?;
        parent_record.subcollections.push(child.id.clone());
        self.backend.update_collection(parent_record.clone()).await?;

        self.collection_list.push(child.clone());
        self.collection_list
            .update_where(|c| c.id == parent_record.id, |c| *c = parent_record.clone());
        tracing::info!(collection = %child.id, name = %child.name, parent = %parent, "collection created");
        Ok(child)
    }

    /// Attach a tag to a collection. Returns `Ok(false)` without touching
    /// durable state when the tag is already present.
    pub async fn add_tag_to(
        &self,
        collection: &CollectionId,
        tag: &TagId,
    ) -> Result<bool, StorageError> {
        let _gate = self.write_gate.lock().await;
        let mut record = self.get(collection).ok_or_else(|| StorageError::Missing {
            kind: "collection",
            id: collection.to_string(),
        })?;
        if !record.attach_tag(tag.clone()) {
            return Ok(false);
        }
        self.backend.update_collection(record.clone()).await?;
        self.collection_list
            .update_where(|c| c.id == record.id, |c| *c = record.clone());
        Ok(true)
    }

    /// Detach a tag from a collection. Returns `Ok(false)` without a
    /// durable write when the tag was not present.
    pub async fn remove_tag_from(
        &self,
        collection: &CollectionId,
        tag: &TagId,
    ) -> Result<bool, StorageError> {
        let _gate = self.write_gate.lock().await;
        let mut record = self.get(collection).ok_or_else(|| StorageError::Missing {
            kind: "collection",
            id: collection.to_string(),
        })?;
        if !record.detach_tag(tag) {
            return Ok(false);
        }
        self.backend.update_collection(record.clone()).await?;
        self.collection_list
            .update_where(|c| c.id == record.id, |c| *c = record.clone());
        Ok(true)
    }

    /// Detach a tag from every collection that references it. Used when a
    /// tag is deleted so the tree never shows dangling entries.
    pub async fn detach_tag_everywhere(&self, tag: &TagId) -> Result<(), StorageError> {
        let holders: Vec<CollectionId> = self
            .collection_list
            .snapshot()
            .into_iter()
            .filter(|c| c.tags.contains(tag))
            .map(|c| c.id)
            .collect();
        for id in holders {
            self.remove_tag_from(&id, tag).await?;
        }
        Ok(())
    }

    /// Remove a non-root collection durably, unlinking it from any parent.
    ///
    /// Child collections and tags are not deleted; subtrees must be
    /// removed leaf-first by the caller.
    pub async fn remove(&self, id: &CollectionId) -> Result<(), StorageError> {
        let _gate = self.write_gate.lock().await;
        if id.is_root() {
            return Err(StorageError::Io(std::io::Error::other(
                "root collection cannot be removed",
            )));
        }
        if let Some(mut parent) = self
            .collection_list
            .find(|c| c.subcollections.contains(id))
        {
            parent.subcollections.retain(|c| c != id);
            self.backend.update_collection(parent.clone()).await?;
            self.collection_list
                .update_where(|c| c.id == parent.id, |c| *c = parent.clone());
        }
        self.backend.remove_collection(id.clone()).await?;
        self.collection_list.remove_where(|c| &c.id == id);
        Ok(())
    }
}
