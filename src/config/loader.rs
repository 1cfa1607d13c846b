use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::core::ChurnmapConfig;
use super::scoring::RiskWeights;
use crate::errors::{ChurnError, Result};

/// File name searched for during config discovery
pub const CONFIG_FILE_NAME: &str = ".churnmap.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Pure function to read config file contents
pub(crate) fn read_config_file(path: &Path) -> std::result::Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse and validate config from a TOML string.
///
/// Invalid scoring weights fall back to the defaults with a warning; any
/// other validation failure is an error.
pub fn parse_and_validate_config(contents: &str) -> Result<ChurnmapConfig> {
    let mut config = toml::from_str::<ChurnmapConfig>(contents)?;

    if let Err(e) = config.scoring.weights.validate() {
        log::warn!("Invalid risk weights: {}. Using defaults.", e);
        config.scoring.weights = RiskWeights::default();
    } else {
        config.scoring.weights.normalize();
    }

    config.validate().map_err(|errors| {
        ChurnError::configuration(format!("invalid {}: {}", CONFIG_FILE_NAME, errors.join("; ")))
    })?;

    Ok(config)
}

/// Load config from an explicit path; a missing or invalid file is an error
pub fn load_config_from_path(path: &Path) -> Result<ChurnmapConfig> {
    let contents = read_config_file(path)?;
    let config = parse_and_validate_config(&contents)?;
    log::debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Pure function to try loading config from a discovered path
pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<ChurnmapConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            log::debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            log::warn!("{}. Using defaults.", e);
            None
        }
    }
}

/// Handle file read errors with appropriate logging
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    // Only log actual errors, not "file not found"
    if error.kind() != std::io::ErrorKind::NotFound {
        log::warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

/// Pure function to generate directory ancestors up to a depth limit
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Discover `.churnmap.toml` from `start` upward, falling back to defaults
pub fn discover_config(start: PathBuf) -> ChurnmapConfig {
    directory_ancestors(start, MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            log::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            ChurnmapConfig::default()
        })
}

/// Discover config starting from the current directory
pub fn load_config() -> ChurnmapConfig {
    match std::env::current_dir() {
        Ok(dir) => discover_config(dir),
        Err(e) => {
            log::warn!(
                "Failed to get current directory: {}. Using default config.",
                e
            );
            ChurnmapConfig::default()
        }
    }
}

/// Render the default configuration as TOML, for `churnmap init`
pub fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&ChurnmapConfig::default())
        .map_err(|e| ChurnError::configuration(format!("failed to render config: {}", e)))
}
