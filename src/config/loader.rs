//! Configuration loading and discovery for `multibuild.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::MultibuildConfig;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the project tree.
pub const CONFIG_FILE_NAME: &str = "multibuild.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse multibuild.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override keymap
    pub keymap: Option<String>,
    /// Override number of parallel jobs
    pub jobs: Option<usize>,
    /// Override make executable
    pub make: Option<String>,
    /// Override status colors
    pub color: Option<bool>,
}

/// Find multibuild.toml by walking up from a specific directory.
///
/// # Returns
/// - `Some(path)` for the nearest enclosing config file
/// - `None` if no config file exists up to the filesystem root
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a multibuild.toml file.
///
/// If no path is given the default configuration is returned.
///
/// # Example
/// ```ignore
/// let config = load_config(Some(Path::new("qmk_firmware/multibuild.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<MultibuildConfig, ConfigError> {
    match path {
        Some(p) => load_config_file(p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<MultibuildConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: MultibuildConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no multibuild.toml is present.
pub fn default_config() -> MultibuildConfig {
    MultibuildConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values. The merged
/// configuration is validated again so a bad override (e.g. `-j 0`)
/// is reported the same way as a bad config file.
pub fn merge_cli_overrides(
    config: &mut MultibuildConfig,
    overrides: &CliOverrides,
) -> Result<(), ConfigError> {
    if let Some(ref keymap) = overrides.keymap {
        config.build.keymap = keymap.clone();
    }

    if let Some(jobs) = overrides.jobs {
        config.build.jobs = jobs;
    }

    if let Some(ref make) = overrides.make {
        config.build.make = Some(make.clone());
    }

    if let Some(color) = overrides.color {
        config.build.color = color;
    }

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(())
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the multibuild.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
