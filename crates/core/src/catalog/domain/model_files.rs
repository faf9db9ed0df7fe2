use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Anything below these sizes cannot be a real model file and is rejected
/// before the contents are inspected.
pub const MIN_WEIGHTS_BYTES: u64 = 1000;
pub const MIN_CONFIG_BYTES: u64 = 100;
pub const MIN_NAMES_BYTES: u64 = 10;

pub const MIN_NETWORK_DIM: u32 = 32;
pub const MAX_NETWORK_DIM: u32 = 2048;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{file} file is too small ({actual} bytes, minimum {minimum})")]
    TooSmall {
        file: &'static str,
        actual: u64,
        minimum: u64,
    },
    #[error("config declares no network input size")]
    UnparsableConfig,
    #[error("network input {width}x{height} is outside the supported 32..=2048 range")]
    DimensionOutOfRange { width: u32, height: u32 },
    #[error("names file lists no classes")]
    NoClassNames,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Facts extracted from a validated weights/config/names triple.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedModelFiles {
    pub input_width: u32,
    pub input_height: u32,
    pub class_names: Vec<String>,
}

/// Checks a candidate model triple before it may enter the catalog.
///
/// Checks run in a fixed order so the first failure is reported without
/// being masked by later ones: file sizes (weights, config, names), then
/// config parsability, then input range, then class names.
pub fn validate(weights: &Path, config: &Path, names: &Path) -> Result<ParsedModelFiles, ValidationError> {
    check_size(weights, "weights", MIN_WEIGHTS_BYTES)?;
    check_size(config, "config", MIN_CONFIG_BYTES)?;
    check_size(names, "names", MIN_NAMES_BYTES)?;

    let config_text = read_text(config)?;
    let (input_width, input_height) =
        parse_network_dims(&config_text).ok_or(ValidationError::UnparsableConfig)?;

    let dim_range = MIN_NETWORK_DIM..=MAX_NETWORK_DIM;
    if !dim_range.contains(&input_width) || !dim_range.contains(&input_height) {
        return Err(ValidationError::DimensionOutOfRange {
            width: input_width,
            height: input_height,
        });
    }

    let class_names = parse_class_names(&read_text(names)?);
    if class_names.is_empty() {
        return Err(ValidationError::NoClassNames);
    }

    Ok(ParsedModelFiles {
        input_width,
        input_height,
        class_names,
    })
}

/// Scans a darknet-style config for the network input size.
///
/// Only the `[net]` section is consulted; the first `width` and `height`
/// keys found there win and scanning stops once both are known.
pub fn parse_network_dims(config_text: &str) -> Option<(u32, u32)> {
    let mut in_net = false;
    let mut width: Option<u32> = None;
    let mut height: Option<u32> = None;

    for raw in config_text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('[') {
            in_net = line == "[net]";
            continue;
        }
        if !in_net {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            match key.trim() {
                "width" if width.is_none() => width = value.trim().parse().ok(),
                "height" if height.is_none() => height = value.trim().parse().ok(),
                _ => {}
            }
        }
        if let (Some(w), Some(h)) = (width, height) {
            return Some((w, h));
        }
    }
    None
}

/// One class label per non-empty line, in file order.
pub fn parse_class_names(names_text: &str) -> Vec<String> {
    names_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn check_size(path: &Path, file: &'static str, minimum: u64) -> Result<(), ValidationError> {
    let actual = fs::metadata(path)
        .map_err(|source| ValidationError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    if actual < minimum {
        return Err(ValidationError::TooSmall {
            file,
            actual,
            minimum,
        });
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String, ValidationError> {
    fs::read_to_string(path).map_err(|source| ValidationError::Read {
        path: path.to_path_buf(),
        source,
    })
}
