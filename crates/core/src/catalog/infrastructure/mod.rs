pub mod builtin_assets;
pub mod file_model_repository;
pub mod json_selection_store;
