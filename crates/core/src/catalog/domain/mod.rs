pub mod model_files;
pub mod model_record;
pub mod model_repository;
pub mod selection;
