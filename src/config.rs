//! Tool configuration.
//!
//! Handles loading, validating, and merging `retouch.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `retouch` reads `retouch.toml` from the working directory, or the file given
//! with `--config`. Without either, stock defaults apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! input = "data/input"          # Directory scanned for source images
//! output = "data/output"        # Directory results are written to
//! extensions = ["jpg", "png"]   # File extensions picked up (case-insensitive)
//!
//! [processing]
//! max_processes = 4             # Parallel units (omit for auto = CPU cores)
//! max_model_jobs = 1            # Concurrent background-removal calls
//! prune_stale = false           # Delete outputs that have no matching input
//!
//! [background]
//! command = "rembg"             # Background removal program
//! model = "u2net"               # Model name passed as `-m` (omit for default)
//! timeout_secs = 300            # Kill a model call after this long (0 = never)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::supported_extensions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "retouch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `retouch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetouchConfig {
    /// Input/output directories and the file types picked up.
    pub paths: PathsConfig,
    /// Parallelism and output housekeeping.
    pub processing: ProcessingConfig,
    /// Background removal collaborator.
    pub background: BackgroundConfig,
}

impl RetouchConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.paths.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "paths.extensions must not be empty".into(),
            ));
        }
        let supported = supported_extensions();
        for ext in &self.paths.extensions {
            if !supported.iter().any(|s| s.eq_ignore_ascii_case(ext)) {
                return Err(ConfigError::Validation(format!(
                    "paths.extensions: {ext:?} is not a supported format (supported: {})",
                    supported.join(", ")
                )));
            }
        }
        if self.paths.input == self.paths.output {
            return Err(ConfigError::Validation(
                "paths.input and paths.output must differ".into(),
            ));
        }
        if self.processing.max_model_jobs == 0 {
            return Err(ConfigError::Validation(
                "processing.max_model_jobs must be at least 1".into(),
            ));
        }
        if self.background.command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "background.command must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub extensions: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/input"),
            output: PathBuf::from("data/output"),
            extensions: vec!["jpg".into(), "png".into()],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of units processed at once.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Maximum concurrent background-removal model calls.
    pub max_model_jobs: usize,
    /// Delete output files with no matching input after a run.
    pub prune_stale: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            max_model_jobs: 1,
            prune_stale: false,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundConfig {
    pub command: String,
    pub model: Option<String>,
    /// Seconds before a model call is killed. `0` waits forever.
    pub timeout_secs: u64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            command: "rembg".into(),
            model: None,
            timeout_secs: 300,
        }
    }
}

impl BackgroundConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// The base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RetouchConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<RetouchConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RetouchConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, or from `retouch.toml` in the working directory.
///
/// An explicitly given file must exist; the implicit one is optional.
pub fn load_config(path: Option<&Path>) -> Result<RetouchConfig, ConfigError> {
    let overlay = match path {
        Some(explicit) => {
            let content = fs::read_to_string(explicit)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(Path::new(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `retouch.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Retouch Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Paths
# ---------------------------------------------------------------------------
[paths]
# Directory scanned for source images (not recursive).
input = "data/input"

# Directory results are written to. Existing files with the same name are
# overwritten.
output = "data/output"

# File extensions picked up from the input directory, case-insensitive.
# Supported: jpg, jpeg, png, tif, tiff, webp, bmp.
extensions = ["jpg", "png"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum images processed in parallel.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Maximum concurrent background-removal model calls. Each call can use
# several hundred MB of memory.
max_model_jobs = 1

# Delete files in the output directory that have no matching input.
# When false, stale files are only reported.
prune_stale = false

# ---------------------------------------------------------------------------
# Background removal
# ---------------------------------------------------------------------------
[background]
# Program invoked as `<command> i [-m <model>] <input> <output>`.
command = "rembg"

# Segmentation model name. Omit for the program's default.
# model = "u2net"

# Seconds a single call may run before it is killed and the image fails.
# 0 waits forever.
timeout_secs = 300
"##
}
