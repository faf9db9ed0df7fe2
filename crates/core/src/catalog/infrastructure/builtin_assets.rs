use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::domain::model_files::parse_class_names;
use crate::shared::constants::{
    CONFIG_FILE_NAME, CONFIG_URL, NAMES_FILE_NAME, NAMES_URL, WEIGHTS_FILE_NAME, WEIGHTS_URL,
};

/// The bundled model's class list ships inside the binary so the catalog
/// can synthesize the built-in entry before any download has happened.
const EMBEDDED_CLASS_NAMES: &str = include_str!("coco.names");

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("failed to create model directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Progress callback: `(file_name, bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(&str, u64, u64) + Send>;

pub fn embedded_class_names() -> Vec<String> {
    parse_class_names(EMBEDDED_CLASS_NAMES)
}

/// Class names for the built-in entry.
///
/// Prefers a fetched names file in the built-in payload directory so a
/// user-refreshed download wins; falls back to the embedded copy.
pub fn builtin_class_names(builtin_dir: &Path) -> Vec<String> {
    let on_disk = fs::read_to_string(builtin_dir.join(NAMES_FILE_NAME))
        .map(|text| parse_class_names(&text))
        .unwrap_or_default();
    if on_disk.is_empty() {
        embedded_class_names()
    } else {
        on_disk
    }
}

/// Downloads the built-in model triple into `builtin_dir`.
///
/// Files already present are kept as-is; each download lands in a `.part`
/// file and is renamed into place only when complete, so an interrupted
/// fetch never leaves a truncated model behind. Returns how many files
/// were actually downloaded.
pub fn fetch(builtin_dir: &Path, progress: Option<ProgressFn>) -> Result<usize, FetchError> {
    fs::create_dir_all(builtin_dir).map_err(|source| FetchError::CreateDir {
        path: builtin_dir.to_path_buf(),
        source,
    })?;

    let files = [
        (WEIGHTS_FILE_NAME, WEIGHTS_URL),
        (CONFIG_FILE_NAME, CONFIG_URL),
        (NAMES_FILE_NAME, NAMES_URL),
    ];

    let mut downloaded = 0;
    for (name, url) in files {
        let dest = builtin_dir.join(name);
        if dest.exists() {
            continue;
        }
        download(url, &dest, name, progress.as_ref())?;
        downloaded += 1;
    }
    Ok(downloaded)
}

fn download(
    url: &str,
    dest: &Path,
    name: &str,
    progress: Option<&ProgressFn>,
) -> Result<(), FetchError> {
    let response = reqwest::blocking::get(url).map_err(|e| FetchError::Download {
        url: url.to_string(),
        source: e,
    })?;

    let total = response.content_length().unwrap_or(0);
    let mut written: u64 = 0;

    let temp_path = dest.with_extension("part");
    let mut file = fs::File::create(&temp_path).map_err(|e| FetchError::Write {
        path: temp_path.clone(),
        source: e,
    })?;

    let bytes = response.bytes().map_err(|e| FetchError::Download {
        url: url.to_string(),
        source: e,
    })?;

    // Report progress in chunks to avoid excessive callbacks
    let chunk_size = 1024 * 1024; // 1MB
    for chunk in bytes.chunks(chunk_size) {
        file.write_all(chunk).map_err(|e| FetchError::Write {
            path: temp_path.clone(),
            source: e,
        })?;
        written += chunk.len() as u64;
        if let Some(cb) = progress {
            cb(name, written, total);
        }
    }

    file.flush().map_err(|e| FetchError::Write {
        path: temp_path.clone(),
        source: e,
    })?;
    drop(file);

    fs::rename(&temp_path, dest).map_err(|e| FetchError::Write {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
