//! Durable JSON-file implementation of the entity store.
//!
//! Each entity kind is persisted as one JSON array file under
//! `<base_dir>/entities/`. Writes are atomic via a temp-rename pattern to
//! prevent corruption from crashes mid-write; a mutation first persists
//! the new table and only then commits it in memory, so a durable failure
//! leaves the loaded tables (and therefore every mirror built on top of
//! them) unchanged.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::backend::{EntityStore, StorageResult};
use crate::entity::{CollectionId, CollectionRecord, FileId, FileRecord, TagId, TagRecord};
use crate::error::StorageError;

/// Manages the on-disk directory layout for durable application data.
///
/// The layout follows this structure:
/// ```text
/// <base_dir>/
///     entities/
///         files.json
///         tags.json
///         collections.json
///     preferences.json
/// ```
///
/// `StoreLayout` is cheap to clone (it wraps a single `PathBuf`) and only
/// computes paths; directories are created lazily by the writers.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    base_dir: PathBuf,
}

impl StoreLayout {
    /// Create a new layout rooted at the given base directory.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the root directory of this layout.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Returns `<base_dir>/entities`.
    pub fn entities_dir(&self) -> PathBuf {
        self.base_dir.join("entities")
    }

    /// Returns the path of the file table.
    pub fn files_path(&self) -> PathBuf {
        self.entities_dir().join("files.json")
    }

    /// Returns the path of the tag table.
    pub fn tags_path(&self) -> PathBuf {
        self.entities_dir().join("tags.json")
    }

    /// Returns the path of the collection table.
    pub fn collections_path(&self) -> PathBuf {
        self.entities_dir().join("collections.json")
    }

    /// Returns the path of the persisted UI preferences document.
    pub fn preferences_path(&self) -> PathBuf {
        self.base_dir.join("preferences.json")
    }
}

/// Load an entity table from disk.
///
/// A missing file is an empty table; a file that exists but cannot be
/// parsed is a hard [`StorageError::Corrupt`] error, surfaced to the
/// caller rather than silently discarded.
fn load_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::Io(e)),
    };
    serde_json::from_str(&content).map_err(|e| StorageError::Corrupt {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Save an entity table atomically.
///
/// Writes to `<path>.tmp` then renames over `path`, so readers never see
/// a partially-written table. Creates the parent directory if needed.
fn save_table<T: Serialize>(path: &Path, table: &[T]) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_vec_pretty(table)
        .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[derive(Default)]
struct Tables {
    files: Vec<FileRecord>,
    tags: Vec<TagRecord>,
    collections: Vec<CollectionRecord>,
}

/// Durable [`EntityStore`] backed by per-kind JSON array files.
///
/// Tables are loaded fully into memory by [`init`](EntityStore::init) and
/// rewritten as a whole on each mutation. That trades write amplification
/// for a trivially consistent snapshot model, which is the right trade
/// for a desktop library measured in thousands of records.
pub struct JsonBackend {
    layout: StoreLayout,
    tables: Mutex<Tables>,
    initialized: AtomicBool,
}

impl JsonBackend {
    /// Create a backend rooted at `base_dir`. No I/O happens until
    /// [`init`](EntityStore::init) is awaited.
    pub fn open(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::new(base_dir),
            tables: Mutex::new(Tables::default()),
            initialized: AtomicBool::new(false),
        }
    }

    /// Returns the layout this backend persists into.
    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Reject calls issued before `init` resolved. Without this guard an
    /// early mutation would persist a near-empty table over real data.
    fn ensure_init(&self) -> Result<(), StorageError> {
        if self.initialized.load(Ordering::Acquire) {
            return Ok(());
        }
        Err(StorageError::Io(io::Error::other(
            "entity store used before init",
        )))
    }
}

impl EntityStore for JsonBackend {
    fn init(&self) -> StorageResult<'_, ()> {
        Box::pin(async {
            let mut tables = self.tables.lock().await;
            tables.files = load_table(&self.layout.files_path())?;
            tables.tags = load_table(&self.layout.tags_path())?;
            tables.collections = load_table(&self.layout.collections_path())?;
            self.initialized.store(true, Ordering::Release);
            tracing::info!(
                base_dir = %self.layout.base_dir().display(),
                files = tables.files.len(),
                tags = tables.tags.len(),
                collections = tables.collections.len(),
                "entity store loaded"
            );
            Ok(())
        })
    }

    fn fetch_files(&self) -> StorageResult<'_, Vec<FileRecord>> {
        Box::pin(async {
            self.ensure_init()?;
            Ok(self.tables.lock().await.files.clone())
        })
    }

    fn fetch_files_by_ids(&self, ids: Vec<FileId>) -> StorageResult<'_, Vec<FileRecord>> {
        Box::pin(async move {
            self.ensure_init()?;
            let tables = self.tables.lock().await;
            Ok(ids
                .iter()
                .filter_map(|id| tables.files.iter().find(|f| &f.id == id).cloned())
                .collect())
        })
    }

    fn fetch_tags(&self) -> StorageResult<'_, Vec<TagRecord>> {
        Box::pin(async {
            self.ensure_init()?;
            Ok(self.tables.lock().await.tags.clone())
        })
    }

    fn fetch_collections(&self) -> StorageResult<'_, Vec<CollectionRecord>> {
        Box::pin(async {
            self.ensure_init()?;
            Ok(self.tables.lock().await.collections.clone())
        })
    }

    fn create_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let mut next = tables.files.clone();
            next.push(file.clone());
            save_table(&self.layout.files_path(), &next)?;
            tables.files = next;
            Ok(file)
        })
    }

    fn update_file(&self, file: FileRecord) -> StorageResult<'_, FileRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.files.iter().position(|f| f.id == file.id) else {
                return Err(StorageError::Missing {
                    kind: "file",
                    id: file.id.to_string(),
                });
            };
            let mut next = tables.files.clone();
            next[pos] = file.clone();
            save_table(&self.layout.files_path(), &next)?;
            tables.files = next;
            Ok(file)
        })
    }

    fn remove_file(&self, id: FileId) -> StorageResult<'_, ()> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.files.iter().position(|f| f.id == id) else {
                return Err(StorageError::Missing {
                    kind: "file",
                    id: id.to_string(),
                });
            };
            let mut next = tables.files.clone();
            next.remove(pos);
            save_table(&self.layout.files_path(), &next)?;
            tables.files = next;
            Ok(())
        })
    }

    fn create_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let mut next = tables.tags.clone();
            next.push(tag.clone());
            save_table(&self.layout.tags_path(), &next)?;
            tables.tags = next;
            Ok(tag)
        })
    }

    fn update_tag(&self, tag: TagRecord) -> StorageResult<'_, TagRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.tags.iter().position(|t| t.id == tag.id) else {
                return Err(StorageError::Missing {
                    kind: "tag",
                    id: tag.id.to_string(),
                });
            };
            let mut next = tables.tags.clone();
            next[pos] = tag.clone();
            save_table(&self.layout.tags_path(), &next)?;
            tables.tags = next;
            Ok(tag)
        })
    }

    fn remove_tag(&self, id: TagId) -> StorageResult<'_, ()> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.tags.iter().position(|t| t.id == id) else {
                return Err(StorageError::Missing {
                    kind: "tag",
                    id: id.to_string(),
                });
            };
            let mut next = tables.tags.clone();
            next.remove(pos);
            save_table(&self.layout.tags_path(), &next)?;
            tables.tags = next;
            Ok(())
        })
    }

    fn create_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let mut next = tables.collections.clone();
            next.push(coll.clone());
            save_table(&self.layout.collections_path(), &next)?;
            tables.collections = next;
            Ok(coll)
        })
    }

    fn update_collection(&self, coll: CollectionRecord) -> StorageResult<'_, CollectionRecord> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.collections.iter().position(|c| c.id == coll.id) else {
                return Err(StorageError::Missing {
                    kind: "collection",
                    id: coll.id.to_string(),
                });
            };
            let mut next = tables.collections.clone();
            next[pos] = coll.clone();
            save_table(&self.layout.collections_path(), &next)?;
            tables.collections = next;
            Ok(coll)
        })
    }

    fn remove_collection(&self, id: CollectionId) -> StorageResult<'_, ()> {
        Box::pin(async move {
            self.ensure_init()?;
            let mut tables = self.tables.lock().await;
            let Some(pos) = tables.collections.iter().position(|c| c.id == id) else {
                return Err(StorageError::Missing {
                    kind: "collection",
                    id: id.to_string(),
                });
            };
            let mut next = tables.collections.clone();
            next.remove(pos);
            save_table(&self.layout.collections_path(), &next)?;
            tables.collections = next;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn layout_path_helpers_correct() {
        let layout = StoreLayout::new("/data/app");
        assert_eq!(layout.base_dir(), Path::new("/data/app"));
        assert_eq!(layout.files_path(), PathBuf::from("/data/app/entities/files.json"));
        assert_eq!(layout.tags_path(), PathBuf::from("/data/app/entities/tags.json"));
        assert_eq!(
            layout.collections_path(),
            PathBuf::from("/data/app/entities/collections.json")
        );
        assert_eq!(
            layout.preferences_path(),
            PathBuf::from("/data/app/preferences.json")
        );
    }

    #[tokio::test]
    async fn init_on_empty_dir_yields_empty_tables() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("init should succeed");

        assert!(backend.fetch_files().await.expect("fetch").is_empty());
        assert!(backend.fetch_tags().await.expect("fetch").is_empty());
        assert!(backend.fetch_collections().await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn calls_before_init_are_rejected() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        let err = backend
            .create_tag(TagRecord::new("early"))
            .await
            .expect_err("pre-init mutation should fail");
        assert!(err.to_string().contains("before init"));
    }

    #[tokio::test]
    async fn created_records_survive_reopen() {
        let tmp = TempDir::new().expect("failed to create temp dir");

        let tag_id;
        {
            let backend = JsonBackend::open(tmp.path());
            backend.init().await.expect("init should succeed");
            let tag = backend
                .create_tag(TagRecord::new("animal"))
                .await
                .expect("create should succeed");
            tag_id = tag.id;
            backend
                .create_file(FileRecord::new("/img/cat.png", Utc::now()))
                .await
                .expect("create should succeed");
        }

        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("reopen init should succeed");
        let tags = backend.fetch_tags().await.expect("fetch should succeed");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, tag_id);
        assert_eq!(tags[0].name, "animal");
        assert_eq!(backend.fetch_files().await.expect("fetch").len(), 1);
    }

    #[tokio::test]
    async fn corrupt_table_fails_init() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let layout = StoreLayout::new(tmp.path());
        std::fs::create_dir_all(layout.entities_dir()).expect("create dir");
        std::fs::write(layout.tags_path(), b"not valid json!!!").expect("write corrupt file");

        let backend = JsonBackend::open(tmp.path());
        let err = backend.init().await.expect_err("init should fail");
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn save_uses_atomic_temp_rename() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("init should succeed");
        backend
            .create_tag(TagRecord::new("cute"))
            .await
            .expect("create should succeed");

        let final_path = backend.layout().tags_path();
        let tmp_path = final_path.with_extension("json.tmp");
        assert!(final_path.exists(), "final table file should exist");
        assert!(
            !tmp_path.exists(),
            "temp file should not exist after successful save"
        );
    }

    #[tokio::test]
    async fn update_replaces_record_in_place() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("init should succeed");

        let mut file = backend
            .create_file(FileRecord::new("/img/old.png", Utc::now()))
            .await
            .expect("create should succeed");
        file.path = "/img/new.png".into();
        backend
            .update_file(file.clone())
            .await
            .expect("update should succeed");

        let files = backend.fetch_files().await.expect("fetch should succeed");
        assert_eq!(files, vec![file]);
    }

    #[tokio::test]
    async fn remove_missing_collection_fails() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("init should succeed");

        let err = backend
            .remove_collection(CollectionId::generate())
            .await
            .expect_err("remove of unknown id should fail");
        assert!(matches!(
            err,
            StorageError::Missing {
                kind: "collection",
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fetch_files_by_ids_scopes_and_orders() {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let backend = JsonBackend::open(tmp.path());
        backend.init().await.expect("init should succeed");

        let a = backend
            .create_file(FileRecord::new("/img/a.png", Utc::now()))
            .await
            .expect("create a");
        let b = backend
            .create_file(FileRecord::new("/img/b.png", Utc::now()))
            .await
            .expect("create b");
        let c = backend
            .create_file(FileRecord::new("/img/c.png", Utc::now()))
            .await
            .expect("create c");

        let fetched = backend
            .fetch_files_by_ids(vec![c.id.clone(), a.id.clone(), FileId::generate()])
            .await
            .expect("fetch should succeed");
        assert_eq!(fetched, vec![c, a]);
        drop(b);
    }
}
