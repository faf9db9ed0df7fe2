use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::constants::{
    BUILT_IN_INPUT_SIZE, BUILT_IN_MODEL_ID, BUILT_IN_MODEL_NAME, CONFIG_FILE_NAME, NAMES_FILE_NAME,
    WEIGHTS_FILE_NAME,
};

/// Catalog entry describing one importable detection model.
///
/// Records are immutable once created; changing a model means importing a
/// new record and deleting the old one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub id: Uuid,
    pub name: String,
    pub weights_file: String,
    pub config_file: String,
    pub names_file: String,
    pub input_width: u32,
    pub input_height: u32,
    pub class_count: usize,
    pub class_names: Vec<String>,
    pub imported_at: DateTime<Utc>,
}

impl ModelRecord {
    /// Synthesizes the bundled model entry.
    ///
    /// The record is never persisted: it carries the reserved nil id and
    /// the Unix epoch as its import time, and is recreated on every
    /// catalog read.
    pub fn built_in(class_names: Vec<String>) -> Self {
        Self {
            id: BUILT_IN_MODEL_ID,
            name: BUILT_IN_MODEL_NAME.to_string(),
            weights_file: WEIGHTS_FILE_NAME.to_string(),
            config_file: CONFIG_FILE_NAME.to_string(),
            names_file: NAMES_FILE_NAME.to_string(),
            input_width: BUILT_IN_INPUT_SIZE,
            input_height: BUILT_IN_INPUT_SIZE,
            class_count: class_names.len(),
            class_names,
            imported_at: DateTime::UNIX_EPOCH,
        }
    }

    /// Built-in status follows from the reserved id alone, never from the
    /// display name, so a user model named like the bundled one stays
    /// deletable.
    pub fn is_built_in(&self) -> bool {
        self.id == BUILT_IN_MODEL_ID
    }

    pub fn display_name(&self) -> &str {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            "Unnamed Model"
        } else {
            trimmed
        }
    }

    pub fn input_size_label(&self) -> String {
        format!("{}x{}", self.input_width, self.input_height)
    }
}
