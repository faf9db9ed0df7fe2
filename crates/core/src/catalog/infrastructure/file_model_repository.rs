use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::catalog::domain::model_files::validate;
use crate::catalog::domain::model_record::ModelRecord;
use crate::catalog::domain::model_repository::{ModelPaths, ModelRepository, RepositoryError};
use crate::catalog::infrastructure::builtin_assets;
use crate::shared::constants::{
    BUILT_IN_MODEL_ID, CONFIG_FILE_NAME, NAMES_FILE_NAME, WEIGHTS_FILE_NAME,
};

const METADATA_FILE: &str = "models.json";

/// Catalog rooted at one directory.
///
/// Layout: `models.json` holds the imported records; each model's files
/// live in a directory named after its id. The built-in entry is
/// synthesized on every read and never written to the metadata document.
///
/// Imports are validated first and committed by directory rename, so a
/// failure at any point leaves the existing catalog untouched.
pub struct FileModelRepository {
    root: PathBuf,
    records: Vec<ModelRecord>,
}

impl FileModelRepository {
    pub fn new(root: PathBuf) -> Result<Self, RepositoryError> {
        fs::create_dir_all(&root).map_err(RepositoryError::Persistence)?;
        let metadata = root.join(METADATA_FILE);
        let records = match fs::read_to_string(&metadata) {
            Ok(json) => match serde_json::from_str::<Vec<ModelRecord>>(&json) {
                Ok(mut records) => {
                    // A persisted record claiming the reserved id would
                    // shadow the synthesized entry.
                    records.retain(|r| !r.is_built_in());
                    records
                }
                Err(e) => {
                    log::warn!(
                        "model catalog at {} is unreadable, starting empty: {e}",
                        metadata.display()
                    );
                    Vec::new()
                }
            },
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("could not read {}: {e}", metadata.display());
                }
                Vec::new()
            }
        };
        Ok(Self { root, records })
    }

    /// Catalog under the platform data directory, e.g.
    /// `~/.local/share/Sightline/models` on Linux.
    pub fn open_default() -> Result<Self, RepositoryError> {
        let root = Self::default_root().ok_or(RepositoryError::NoDataDir)?;
        Self::new(root)
    }

    pub fn default_root() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("Sightline").join("models"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the built-in model's files live once fetched.
    pub fn builtin_dir(&self) -> PathBuf {
        self.payload_dir(BUILT_IN_MODEL_ID)
    }

    fn payload_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    fn synthesize_built_in(&self) -> ModelRecord {
        ModelRecord::built_in(builtin_assets::builtin_class_names(&self.builtin_dir()))
    }

    fn save_metadata(&self) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(&self.records)
            .map_err(|e| RepositoryError::Persistence(e.into()))?;
        let path = self.metadata_path();
        let temp = path.with_extension("json.part");
        fs::write(&temp, json).map_err(RepositoryError::Persistence)?;
        fs::rename(&temp, &path).map_err(RepositoryError::Persistence)?;
        Ok(())
    }
}

impl ModelRepository for FileModelRepository {
    fn list(&self) -> Result<Vec<ModelRecord>, RepositoryError> {
        let mut models = Vec::with_capacity(self.records.len() + 1);
        models.push(self.synthesize_built_in());
        models.extend(self.records.iter().cloned());
        Ok(models)
    }

    fn find(&self, id: Uuid) -> Result<Option<ModelRecord>, RepositoryError> {
        if id == BUILT_IN_MODEL_ID {
            return Ok(Some(self.synthesize_built_in()));
        }
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn import(&mut self, name: &str, files: &ModelPaths) -> Result<ModelRecord, RepositoryError> {
        let parsed = validate(&files.weights, &files.config, &files.names)?;

        let id = Uuid::new_v4();
        let record = ModelRecord {
            id,
            name: name.to_string(),
            weights_file: file_name_of(&files.weights, WEIGHTS_FILE_NAME),
            config_file: file_name_of(&files.config, CONFIG_FILE_NAME),
            names_file: file_name_of(&files.names, NAMES_FILE_NAME),
            input_width: parsed.input_width,
            input_height: parsed.input_height,
            class_count: parsed.class_names.len(),
            class_names: parsed.class_names,
            imported_at: Utc::now(),
        };

        // Stage next to the final location, then rename, so a half-copied
        // payload never becomes visible under the model's id.
        let staged = self.root.join(format!(".stage-{id}"));
        let final_dir = self.payload_dir(id);
        if let Err(e) = copy_payload(files, &record, &staged) {
            let _ = fs::remove_dir_all(&staged);
            return Err(e);
        }
        if let Err(e) = fs::rename(&staged, &final_dir) {
            let _ = fs::remove_dir_all(&staged);
            return Err(RepositoryError::Persistence(e));
        }

        self.records.push(record.clone());
        if let Err(e) = self.save_metadata() {
            self.records.pop();
            let _ = fs::remove_dir_all(&final_dir);
            return Err(e);
        }
        Ok(record)
    }

    fn delete(&mut self, id: Uuid) -> Result<(), RepositoryError> {
        if id == BUILT_IN_MODEL_ID {
            return Err(RepositoryError::ForbiddenDelete);
        }
        let position = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(RepositoryError::UnknownModel(id))?;

        let removed = self.records.remove(position);
        if let Err(e) = self.save_metadata() {
            self.records.insert(position, removed);
            return Err(e);
        }

        if let Err(e) = fs::remove_dir_all(self.payload_dir(id)) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove files of deleted model {id}: {e}");
            }
        }
        Ok(())
    }

    fn resolve_paths(&self, record: &ModelRecord) -> Result<ModelPaths, RepositoryError> {
        let dir = self.payload_dir(record.id);
        let paths = ModelPaths {
            weights: dir.join(&record.weights_file),
            config: dir.join(&record.config_file),
            names: dir.join(&record.names_file),
        };

        let missing: Vec<&str> = [
            (&paths.weights, record.weights_file.as_str()),
            (&paths.config, record.config_file.as_str()),
            (&paths.names, record.names_file.as_str()),
        ]
        .into_iter()
        .filter(|(path, _)| !path.exists())
        .map(|(_, name)| name)
        .collect();

        if missing.is_empty() {
            Ok(paths)
        } else {
            Err(RepositoryError::MissingFiles {
                id: record.id,
                missing: missing.join(", "),
            })
        }
    }
}

fn copy_payload(
    files: &ModelPaths,
    record: &ModelRecord,
    staged: &Path,
) -> Result<(), RepositoryError> {
    fs::create_dir_all(staged).map_err(RepositoryError::Persistence)?;
    for (src, dest_name) in [
        (&files.weights, &record.weights_file),
        (&files.config, &record.config_file),
        (&files.names, &record.names_file),
    ] {
        fs::copy(src, staged.join(dest_name)).map_err(RepositoryError::Persistence)?;
    }
    Ok(())
}

fn file_name_of(path: &Path, fallback: &str) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(fallback)
        .to_string()
}
