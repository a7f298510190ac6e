//! The durable entity store contract consumed by the domain stores.
//!
//! [`EntityStore`] is the only surface through which anything in this
//! crate touches persistent storage. It is object-safe: every method
//! returns a boxed `Send` future so the trait can live behind
//! `Arc<dyn EntityStore>` and be shared across spawned tasks.
//!
//! Each durable mutation returns the stored record (or fails with a
//! [`StorageError`]); the caller is responsible for updating its
//! in-memory mirror only after the durable write succeeds.

use std::future::Future;
use std::pin::Pin;

use crate::entity::{CollectionId, CollectionRecord, FileId, FileRecord, TagId, TagRecord};
use crate::error::StorageError;

/// Boxed `Send` future, used to keep [`EntityStore`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shorthand for the result type of every `EntityStore` method.
pub type StorageResult<'a, T> = BoxFuture<'a, Result<T, StorageError>>;

/// Durable CRUD surface for files, tags, and collections.
///
/// # Contract
///
/// - [`init`](EntityStore::init) must be awaited to completion before any
///   other method is called; the store is unusable until it resolves.
/// - `fetch_*` methods return a point-in-time snapshot of the table.
/// - [`fetch_files_by_ids`](EntityStore::fetch_files_by_ids) returns
///   records in request order, silently skipping ids with no record.
/// - `create_*` / `update_*` / `remove_*` either land durably and return
///   `Ok`, or fail without partial effect.
pub trait EntityStore: Send + Sync + 'static {
    /// Prepare the store for use (open/load the backing tables).
    fn init(&self) -> StorageResult<'_, ()>;

    /// Fetch all file records.
    fn fetch_files(&self) -> StorageResult<'_, Vec<FileRecord>>;

    /// Fetch the file records for exactly the given ids, in the given
    /// order. Missing ids are skipped, not errors.
    fn fetch_files_by_ids(&self, ids: Vec<FileId>) -> StorageResult<'_, Vec<FileRecord>>;

    /// Fetch all tag records.
    fn fetch_tags(&self) -> StorageResult<'_, Vec<TagRecord>>;

    /// Fetch all collection records.
    fn fetch_collections(&self) -> StorageResult<'_, Vec<CollectionRecord>>;

    /// Durably create a file record.
    fn create_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord>;

    /// Durably replace the file record with the same id.
    fn update_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord>;

    /// Durably remove a file record.
    fn remove_file(&self, id: FileId) -> StorageResult<'_, ()>;

    /// Durably create a tag record.
    fn create_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord>;

    /// Durably replace the tag record with the same id.
    fn update_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord>;

    /// Durably remove a tag record.
    fn remove_tag(&self, id: TagId) -> StorageResult<'_, ()>;

    /// Durably create a collection record.
    fn create_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord>;

    /// Durably replace the collection record with the same id.
    fn update_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord>;

    /// Durably remove a collection record.
    fn remove_collection(&self, id: CollectionId) -> StorageResult<'_, ()>;
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    //! Reusable backends for store and window tests.

    use std::io;
    use std::sync::Arc;

    use tokio::sync::Mutex;

    use super::*;

    /// In-memory [`EntityStore`] holding plain `Vec` tables.
    ///
    /// Used as the durable side in write-through and mirror tests where
    /// disk persistence is irrelevant.
    #[derive(Default)]
    pub(crate) struct MemoryBackend {
        tables: Arc<Mutex<Tables>>,
    }

    #[derive(Default)]
    struct Tables {
        files: Vec<FileRecord>,
        tags: Vec<TagRecord>,
        collections: Vec<CollectionRecord>,
    }

    impl MemoryBackend {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Number of durable tag records (for duplicate-bounding asserts).
        pub(crate) async fn tag_count(&self) -> usize {
            self.tables.lock().await.tags.len()
        }

        /// Number of durable file records.
        pub(crate) async fn file_count(&self) -> usize {
            self.tables.lock().await.files.len()
        }

        /// Seed a file record directly, bypassing the store contract.
        pub(crate) async fn seed_file(&self, file: FileRecord) {
            self.tables.lock().await.files.push(file);
        }

        /// Seed a tag record directly, bypassing the store contract.
        pub(crate) async fn seed_tag(&self, tag: TagRecord) {
            self.tables.lock().await.tags.push(tag);
        }
    }

    impl EntityStore for MemoryBackend {
        fn init(&self) -> StorageResult<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn fetch_files(&self) -> StorageResult<'_, Vec<FileRecord>> {
            Box::pin(async { Ok(self.tables.lock().await.files.clone()) })
        }

        fn fetch_files_by_ids(&self, ids: Vec<FileId>) -> StorageResult<'_, Vec<FileRecord>> {
            Box::pin(async move {
                let tables = self.tables.lock().await;
                Ok(ids
                    .iter()
                    .filter_map(|id| tables.files.iter().find(|f| &f.id == id).cloned())
                    .collect())
            })
        }

        fn fetch_tags(&self) -> StorageResult<'_, Vec<TagRecord>> {
            Box::pin(async { Ok(self.tables.lock().await.tags.clone()) })
        }

        fn fetch_collections(&self) -> StorageResult<'_, Vec<CollectionRecord>> {
            Box::pin(async { Ok(self.tables.lock().await.collections.clone()) })
        }

        fn create_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord> {
            Box::pin(async move {
                self.tables.lock().await.files.push(file.clone());
                Ok(file)
            })
        }

        fn update_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                match tables.files.iter_mut().find(|f| f.id == file.id) {
                    Some(slot) => {
                        *slot = file.clone();
                        Ok(file)
                    }
                    None => Err(StorageError::Missing {
                        kind: "file",
                        id: file.id.to_string(),
                    }),
                }
            })
        }

        fn remove_file(&self, id: FileId) -> StorageResult<'_, ()> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                let before = tables.files.len();
                tables.files.retain(|f| f.id != id);
                if tables.files.len() == before {
                    return Err(StorageError::Missing {
                        kind: "file",
                        id: id.to_string(),
                    });
                }
                Ok(())
            })
        }

        fn create_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord> {
            Box::pin(async move {
                self.tables.lock().await.tags.push(tag.clone());
                Ok(tag)
            })
        }

        fn update_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                match tables.tags.iter_mut().find(|t| t.id == tag.id) {
                    Some(slot) => {
                        *slot = tag.clone();
                        Ok(tag)
                    }
                    None => Err(StorageError::Missing {
                        kind: "tag",
                        id: tag.id.to_string(),
                    }),
                }
            })
        }

        fn remove_tag(&self, id: TagId) -> StorageResult<'_, ()> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                let before = tables.tags.len();
                tables.tags.retain(|t| t.id != id);
                if tables.tags.len() == before {
                    return Err(StorageError::Missing {
                        kind: "tag",
                        id: id.to_string(),
                    });
                }
                Ok(())
            })
        }

        fn create_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord> {
            Box::pin(async move {
                self.tables.lock().await.collections.push(coll.clone());
                Ok(coll)
            })
        }

        fn update_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                match tables.collections.iter_mut().find(|c| c.id == coll.id) {
                    Some(slot) => {
                        *slot = coll.clone();
                        Ok(coll)
                    }
                    None => Err(StorageError::Missing {
                        kind: "collection",
                        id: coll.id.to_string(),
                    }),
                }
            })
        }

        fn remove_collection(&self, id: CollectionId) -> StorageResult<'_, ()> {
            Box::pin(async move {
                let mut tables = self.tables.lock().await;
                let before = tables.collections.len();
                tables.collections.retain(|c| c.id != id);
                if tables.collections.len() == before {
                    return Err(StorageError::Missing {
                        kind: "collection",
                        id: id.to_string(),
                    });
                }
                Ok(())
            })
        }
    }

    /// An [`EntityStore`] whose every call fails with an I/O error.
    ///
    /// Used to assert that failed durable writes leave mirrors untouched.
    pub(crate) struct FailingBackend;

    fn offline<T>() -> StorageResult<'static, T>
    where
        T: Send + 'static,
    {
        Box::pin(async { Err(StorageError::Io(io::Error::other("backend offline"))) })
    }

    impl EntityStore for FailingBackend {
        fn init(&self) -> StorageResult<'_, ()> {
            offline()
        }

        fn fetch_files(&self) -> StorageResult<'_, Vec<FileRecord>> {
            offline()
        }

        fn fetch_files_by_ids(&self, _ids: Vec<FileId>) -> StorageResult<'_, Vec<FileRecord>> {
            offline()
        }

        fn fetch_tags(&self) -> StorageResult<'_, Vec<TagRecord>> {
            offline()
        }

        fn fetch_collections(&self) -> StorageResult<'_, Vec<CollectionRecord>> {
            offline()
        }

        fn create_file(&self, _file: FileRecord) -> StorageResult<'_, FileRecord> {
            offline()
        }

        fn update_file(&self, _file: FileRecord) -> StorageResult<'_, FileRecord> {
            offline()
        }

        fn remove_file(&self, _id: FileId) -> StorageResult<'_, ()> {
            offline()
        }

        fn create_tag(&self, _tag: TagRecord) -> StorageResult<'_, TagRecord> {
            offline()
        }

        fn update_tag(&self, _tag: TagRecord) -> StorageResult<'_, TagRecord> {
            offline()
        }

        fn remove_tag(&self, _id: TagId) -> StorageResult<'_, ()> {
            offline()
        }

        fn create_collection(
            &self,
            _coll: CollectionRecord,
        ) -> StorageResult<'_, CollectionRecord> {
            offline()
        }

        fn update_collection(
            &self,
            _coll: CollectionRecord,
        ) -> StorageResult<'_, CollectionRecord> {
            offline()
        }

        fn remove_collection(&self, _id: CollectionId) -> StorageResult<'_, ()> {
            offline()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::test_fixtures::{FailingBackend, MemoryBackend};
    use super::*;

    #[tokio::test]
    async fn memory_backend_create_then_fetch() {
        let backend = MemoryBackend::new();
        backend.init().await.expect("init should succeed");

        let file = FileRecord::new("/img/a.png", Utc::now());
        let stored = backend
            .create_file(file.clone())
            .await
            .expect("create should succeed");
        assert_eq!(stored, file);

        let all = backend.fetch_files().await.expect("fetch should succeed");
        assert_eq!(all, vec![file]);
    }

    #[tokio::test]
    async fn fetch_files_by_ids_preserves_request_order_and_skips_missing() {
        let backend = MemoryBackend::new();
        let a = FileRecord::new("/img/a.png", Utc::now());
        let b = FileRecord::new("/img/b.png", Utc::now());
        backend.seed_file(a.clone()).await;
        backend.seed_file(b.clone()).await;

        let fetched = backend
            .fetch_files_by_ids(vec![b.id.clone(), FileId::generate(), a.id.clone()])
            .await
            .expect("fetch should succeed");

        assert_eq!(fetched, vec![b, a]);
    }

    #[tokio::test]
    async fn update_missing_file_fails() {
        let backend = MemoryBackend::new();
        let err = backend
            .update_file(FileRecord::new("/img/ghost.png", Utc::now()))
            .await
            .expect_err("update of unknown id should fail");
        assert!(matches!(err, StorageError::Missing { kind: "file", .. }));
    }

    #[tokio::test]
    async fn failing_backend_rejects_everything() {
        let backend: Arc<dyn EntityStore> = Arc::new(FailingBackend);
        assert!(backend.init().await.is_err());
        assert!(backend.fetch_tags().await.is_err());
        assert!(backend.create_tag(TagRecord::new("x")).await.is_err());
    }
}
