//! Tag resolution: map tag names to tag records, creating what is missing.
//!
//! Resolution is lookup-then-create without a lock between the two steps.
//! Two concurrent resolutions of the same unseen name can therefore both
//! create a tag, leaving at most one duplicate per concurrent caller.
//! That is accepted: duplicates are bounded, harmless to readers, and a
//! serialization point here would stall every import on the slowest
//! durable write. Sequential resolutions of the same name always reuse
//! the existing tag.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::collections::TagCollectionStore;
use crate::entity::{CollectionId, FileId, TagRecord};
use crate::error::{StorageError, StoreError};
use crate::files::FileStore;
use crate::tags::TagStore;

/// Resolves tag names against the tag store, attaching freshly created
/// tags to the root collection so they are reachable from the tree.
#[derive(Clone)]
pub struct TagResolver {
    tags: Arc<TagStore>,
    collections: Arc<TagCollectionStore>,
}

impl TagResolver {
    /// Build a resolver over the given stores. Both stores must have been
    /// populated via `fetch_all` before resolution runs.
    pub fn new(tags: Arc<TagStore>, collections: Arc<TagCollectionStore>) -> Self {
        Self { tags, collections }
    }

    /// Resolve one name: return the existing tag with that exact name, or
    /// create it and link it under the root collection.
    pub async fn resolve_one(&self, name: &str) -> Result<TagRecord, StorageError> {
        if let Some(existing) = self.tags.find_by_name(name) {
            return Ok(existing);
        }
        let tag = self.tags.add_tag(name).await?;
        self.collections
            .add_tag_to(&CollectionId::root(), &tag.id)
            .await?;
        tracing::debug!(tag = %tag.id, name = %tag.name, "tag resolved by creation");
        Ok(tag)
    }

    /// Resolve a batch of names concurrently.
    ///
    /// Results come back in input order regardless of task completion
    /// order. The first failure wins; remaining tasks are aborted when
    /// the set drops.
    pub async fn resolve_or_create(&self, names: Vec<String>) -> Result<Vec<TagRecord>, StoreError> {
        let count = names.len();
        let mut set = JoinSet::new();
        for (idx, name) in names.into_iter().enumerate() {
            let resolver = self.clone();
            set.spawn(async move { (idx, resolver.resolve_one(&name).await) });
        }

        let mut resolved: Vec<Option<TagRecord>> = (0..count).map(|_| None).collect();
        let mut first_err: Option<StoreError> = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, Ok(tag))) => resolved[idx] = Some(tag),
                Ok((_, Err(e))) => {
                    if first_err.is_none() {
                        first_err = Some(e.into());
                    }
                }
                Err(e) => {
                    if first_err.is_none() {
                        first_err = Some(StoreError::Background(e.to_string()));
                    }
                }
            }
        }
        if let Some(err) = first_err {
            return Err(err);
        }
        Ok(resolved.into_iter().flatten().collect())
    }

    /// Resolve names and attach every resolved tag to the given file.
    ///
    /// Attachment is sequential and stops at the first failure, so a
    /// partial attach is possible; the file is never left referencing a
    /// tag that was not durably created.
    pub async fn tag_file(
        &self,
        files: &FileStore,
        file: &FileId,
        names: Vec<String>,
    ) -> Result<Vec<TagRecord>, StoreError> {
        let tags = self.resolve_or_create(names).await?;
        for tag in &tags {
            files.add_tag(file, &tag.id).await?;
        }
        Ok(tags)
    }
}
