//! State synchronization and tag resolution for a multi-window media
//! library: durable entity storage, observable in-memory mirrors, and the
//! bridge protocol that keeps windows consistent.

mod backend;
pub use backend::{BoxFuture, EntityStore, StorageResult};
mod bridge;
pub use bridge::{
    ImportItem, OrchestratorHandle, ToOrchestrator, ToWindow, WindowEndpoint, WindowNotifier,
    channel,
};
mod collections;
mod entity;
mod error;
mod files;
mod observe;
mod prefs;
mod resolve;
mod root;
mod storage;
mod tags;
mod ui;
mod window;

pub use collections::TagCollectionStore;
pub use entity::{
    CollectionId, CollectionRecord, FileId, FileRecord, ROOT_COLLECTION_ID, ROOT_COLLECTION_NAME,
    TagId, TagRecord,
};
pub use error::{BridgeError, StorageError, StoreError};
pub use files::FileStore;
pub use observe::{ObservableList, Subscription};
pub use prefs::{UiPreferences, load_preferences, save_preferences};
pub use resolve::TagResolver;
pub use root::{InitOptions, RootStore};
pub use storage::{JsonBackend, StoreLayout};
pub use tags::TagStore;
pub use ui::{UiStore, ViewMode};
pub use window::{PREVIEW_WINDOW_BASENAME, WindowKind, WindowPhase, WindowSession};
