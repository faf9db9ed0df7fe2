use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::catalog::domain::model_files::ValidationError;
use crate::catalog::domain::model_record::ModelRecord;

/// On-disk locations of one model's weights/config/names triple.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelPaths {
    pub weights: PathBuf,
    pub config: PathBuf,
    pub names: PathBuf,
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("no model with id {0} in the catalog")]
    UnknownModel(Uuid),
    #[error("model {id} is missing files on disk: {missing}")]
    MissingFiles { id: Uuid, missing: String },
    #[error("the built-in model cannot be deleted")]
    ForbiddenDelete,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to update the model catalog: {0}")]
    Persistence(#[source] std::io::Error),
    #[error("could not determine a data directory")]
    NoDataDir,
}

/// Port over the local model catalog.
///
/// The catalog always contains the synthesized built-in entry plus any
/// imported models; implementations own layout and persistence.
pub trait ModelRepository: Send {
    /// All models, built-in first, then imports in catalog order.
    fn list(&self) -> Result<Vec<ModelRecord>, RepositoryError>;

    fn find(&self, id: Uuid) -> Result<Option<ModelRecord>, RepositoryError>;

    /// Validates and copies a model triple into the catalog.
    ///
    /// Nothing the catalog already holds may change when an import fails
    /// part way through.
    fn import(&mut self, name: &str, files: &ModelPaths) -> Result<ModelRecord, RepositoryError>;

    /// Removes an imported model and its files. The built-in entry is
    /// refused with [`RepositoryError::ForbiddenDelete`].
    fn delete(&mut self, id: Uuid) -> Result<(), RepositoryError>;

    /// Locations an engine should load this model from, verified present.
    fn resolve_paths(&self, record: &ModelRecord) -> Result<ModelPaths, RepositoryError>;
}
