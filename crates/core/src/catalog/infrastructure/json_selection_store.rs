use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::domain::selection::SelectionStore;

#[derive(Debug, Serialize, Deserialize)]
struct StoredSelection {
    selected_model: String,
}

/// File-backed selection pointer.
///
/// A missing or unreadable file simply means no selection; saving always
/// writes the canonical id form, so legacy name-based values disappear on
/// the next save.
pub struct JsonSelectionStore {
    path: PathBuf,
}

impl JsonSelectionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store under the platform config directory, e.g.
    /// `~/.config/Sightline/selection.json` on Linux.
    pub fn open_default() -> Option<Self> {
        dirs::config_dir().map(|d| Self::new(d.join("Sightline").join("selection.json")))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SelectionStore for JsonSelectionStore {
    fn load(&self) -> Option<String> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|json| serde_json::from_str::<StoredSelection>(&json).ok())
            .map(|stored| stored.selected_model)
    }

    fn save(&mut self, id: Uuid) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let stored = StoredSelection {
            selected_model: id.to_string(),
        };
        if let Ok(json) = serde_json::to_string_pretty(&stored) {
            if let Err(e) = fs::write(&self.path, json) {
                log::warn!("failed to persist model selection: {e}");
            }
        }
    }
}
