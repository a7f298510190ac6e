//! Per-window UI state: view mode, selection, and persisted preferences.
//!
//! The selection is an [`ObservableList`] so window chrome (titles,
//! toolbars) can subscribe to it exactly like the entity mirrors. The
//! rest of the state is plain fields behind a mutex; none of it is
//! durable except what
//! [`UiStore::store_persistent_preferences`] explicitly writes out.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::entity::FileId;
use crate::error::StorageError;
use crate::observe::ObservableList;
use crate::prefs::{self, UiPreferences};

/// How the content area lays out files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Thumbnail grid, the default.
    Grid,
    /// Detail list.
    List,
    /// One file at a time; the mode preview windows use.
    Slide,
}

#[derive(Debug)]
struct UiState {
    view_mode: ViewMode,
    first_item: usize,
    thumbnail_directory: Option<PathBuf>,
    preview_open: bool,
    preferences_path: Option<PathBuf>,
}

/// Volatile UI state for one window.
pub struct UiStore {
    state: Mutex<UiState>,
    file_selection: ObservableList<FileId>,
}

impl Default for UiStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UiStore {
    /// Create a store with default state and no preference persistence.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UiState {
                view_mode: ViewMode::Grid,
                first_item: 0,
                thumbnail_directory: None,
                preview_open: false,
                preferences_path: None,
            }),
            file_selection: ObservableList::new(),
        }
    }

    /// Create a store that persists preferences at the given path.
    pub fn with_preferences_path(path: impl Into<PathBuf>) -> Self {
        let store = Self::new();
        store.lock().preferences_path = Some(path.into());
        store
    }

    fn lock(&self) -> MutexGuard<'_, UiState> {
        // UI state stays readable even if a panicking reader poisoned it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current view mode.
    pub fn view_mode(&self) -> ViewMode {
        self.lock().view_mode
    }

    /// Switch the content view mode.
    pub fn set_view_mode(&self, mode: ViewMode) {
        self.lock().view_mode = mode;
    }

    /// Switch to slide view. Preview windows always run in this mode.
    pub fn set_view_slide(&self) {
        self.set_view_mode(ViewMode::Slide);
    }

    /// Index of the first visible item in the content area.
    pub fn first_item(&self) -> usize {
        self.lock().first_item
    }

    /// Scroll the content area so the given index is first.
    pub fn set_first_item(&self, index: usize) {
        self.lock().first_item = index;
    }

    /// Thumbnail cache directory, if configured.
    pub fn thumbnail_directory(&self) -> Option<PathBuf> {
        self.lock().thumbnail_directory.clone()
    }

    /// Set the thumbnail cache directory.
    pub fn set_thumbnail_directory(&self, dir: impl Into<PathBuf>) {
        self.lock().thumbnail_directory = Some(dir.into());
    }

    /// Whether this (main) window currently has a preview window open.
    pub fn is_preview_open(&self) -> bool {
        self.lock().preview_open
    }

    /// Record that a preview window opened or closed.
    pub fn set_preview_open(&self, open: bool) {
        self.lock().preview_open = open;
    }

    /// The observable file selection.
    pub fn file_selection(&self) -> &ObservableList<FileId> {
        &self.file_selection
    }

    /// Add a file to the selection. Selecting an already-selected file is
    /// a no-op, so no notification fires.
    pub fn select_file(&self, id: FileId) {
        if self.file_selection.find(|s| s == &id).is_none() {
            self.file_selection.push(id);
        }
    }

    /// Remove a file from the selection.
    pub fn deselect_file(&self, id: &FileId) {
        self.file_selection.remove_where(|s| s == id);
    }

    /// Empty the selection.
    pub fn clear_file_selection(&self) {
        self.file_selection.clear();
    }

    /// Apply persisted preferences, if a usable document exists at the
    /// configured path. Without a path this is a no-op.
    pub fn recover_persistent_preferences(&self) -> Result<(), StorageError> {
        let Some(path) = self.lock().preferences_path.clone() else {
            return Ok(());
        };
        let Some(loaded) = prefs::load_preferences(&path)? else {
            tracing::debug!(path = %path.display(), "no persisted preferences");
            return Ok(());
        };
        let mut state = self.lock();
        state.view_mode = loaded.view_mode;
        state.thumbnail_directory = loaded.thumbnail_directory;
        tracing::info!(path = %path.display(), "preferences recovered");
        Ok(())
    }

    /// Persist the current preferences to the configured path. Without a
    /// path this is a no-op.
    pub fn store_persistent_preferences(&self) -> Result<(), StorageError> {
        let (path, snapshot) = {
            let state = self.lock();
            let Some(path) = state.preferences_path.clone() else {
                return Ok(());
            };
            (
                path,
                UiPreferences {
                    view_mode: state.view_mode,
                    thumbnail_directory: state.thumbnail_directory.clone(),
                },
            )
        };
        prefs::save_preferences(&path, &snapshot)?;
        tracing::debug!(path = %path.display(), "preferences stored");
        Ok(())
    }
}
