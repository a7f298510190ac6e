//! Persisted UI preferences.
//!
//! Preferences are a convenience, not data: saving is atomic like the
//! entity tables, but loading is tolerant. A missing or unreadable
//! preferences file yields `Ok(None)` with a warning so a stale or
//! corrupt document can never block startup.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::ui::ViewMode;

/// The UI state worth keeping across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiPreferences {
    /// Content view mode to restore on startup.
    pub view_mode: ViewMode,
    /// Directory where thumbnails are cached, if configured.
    pub thumbnail_directory: Option<PathBuf>,
}

impl Default for UiPreferences {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Grid,
            thumbnail_directory: None,
        }
    }
}

/// Persist preferences atomically via a temp-rename write.
pub fn save_preferences(path: &Path, prefs: &UiPreferences) -> Result<(), StorageError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_vec_pretty(prefs)
        .map_err(|e| StorageError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load persisted preferences, if a usable document exists.
///
/// Returns `Ok(None)` when the file is missing or cannot be parsed; only
/// an I/O failure on an existing file is an error.
pub fn load_preferences(path: &Path) -> Result<Option<UiPreferences>, StorageError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::Io(e)),
    };
    match serde_json::from_str(&content) {
        Ok(prefs) => Ok(Some(prefs)),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "ignoring unreadable preferences document"
            );
            Ok(None)
        }
    }
}
