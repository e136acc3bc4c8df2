//! Build configuration.
//!
//! Settings are optional and layered: stock defaults are overridden by a
//! `scad-batch.toml` placed in the source directory.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [render]
//! source_extension = "scad"   # Files rendered from the source directory
//! artifact_extension = "stl"  # Extension of the renderer's output
//! accuracy_marker = "$fn"     # Lines containing this are rewritten by RENDER_WITH
//! temp_suffix = "_temp"       # Appended to the stem of derived source files
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the optional config file in the source directory.
pub const CONFIG_FILENAME: &str = "scad-batch.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// File naming and accuracy substitution.
    pub render: RenderSettings,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl BuildConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.render;
        for (name, ext) in [
            ("render.source_extension", &r.source_extension),
            ("render.artifact_extension", &r.artifact_extension),
        ] {
            if ext.is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
            if ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "{name} must not start with a dot"
                )));
            }
        }
        if r.source_extension.eq_ignore_ascii_case(&r.artifact_extension) {
            return Err(ConfigError::Validation(
                "render.source_extension and render.artifact_extension must differ".into(),
            ));
        }
        if r.accuracy_marker.trim().is_empty() {
            return Err(ConfigError::Validation(
                "render.accuracy_marker must not be empty".into(),
            ));
        }
        if r.temp_suffix.is_empty() {
            return Err(ConfigError::Validation(
                "render.temp_suffix must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// How source files map to renderer inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderSettings {
    pub source_extension: String,
    pub artifact_extension: String,
    /// Token identifying the resolution line replaced by `RENDER_WITH`.
    pub accuracy_marker: String,
    pub temp_suffix: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            source_extension: "scad".to_string(),
            artifact_extension: "stl".to_string(),
            accuracy_marker: "$fn".to_string(),
            temp_suffix: "_temp".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective worker count from config.
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

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(BuildConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key-by-key; any other overlay value replaces the base value.
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

/// Load the raw config file from a directory, `Ok(None)` when absent.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config for a source directory: stock defaults, then the directory's
/// config file, then validation.
pub fn load_config(dir: &Path) -> Result<BuildConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(dir)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: BuildConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock config file.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# scad-batch configuration
# ========================
# Place this file as `scad-batch.toml` in the source directory.
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# Extension of the source files picked up from the source directory.
source_extension = "scad"

# Extension of the artifacts written to <destination>/out/.
artifact_extension = "stl"

# Lines containing this token are replaced by `<token>=<value>;` when a file
# declares RENDER_WITH=<value>; in its directive block.
accuracy_marker = "$fn"

# Appended to the file stem of derived (temporary) source files.
temp_suffix = "_temp"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
