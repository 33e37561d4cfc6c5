//! Configuration schema types for `multibuild.toml`
//!
//! Defines the structure and validation rules for a firmware tree's
//! multibuild configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Project layout section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Directory holding the keyboard definitions
    #[serde(default = "default_keyboards")]
    pub keyboards: PathBuf,
    /// Build output directory (plan file, logs, failure markers)
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { keyboards: default_keyboards(), build_dir: default_build_dir() }
    }
}

fn default_keyboards() -> PathBuf {
    PathBuf::from("keyboards")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(".build")
}

/// Build settings applied to every generated rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Keymap compiled for every keyboard
    #[serde(default = "default_keymap")]
    pub keymap: String,
    /// Per-keyboard makefile, relative to the project root
    #[serde(default = "default_makefile")]
    pub makefile: PathBuf,
    /// File name of the generated plan inside the build directory
    #[serde(default = "default_plan_file")]
    pub plan_file: String,
    /// Number of parallel make jobs
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Colorize status lines and sub-make output
    #[serde(default = "default_true")]
    pub color: bool,
    /// Make executable (found automatically when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    /// Filters applied before any given on the command line
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            keymap: default_keymap(),
            makefile: default_makefile(),
            plan_file: default_plan_file(),
            jobs: default_jobs(),
            color: true,
            make: None,
            filters: vec![],
        }
    }
}

fn default_keymap() -> String {
    "default".to_string()
}

fn default_makefile() -> PathBuf {
    PathBuf::from("build_keyboard.mk")
}

fn default_plan_file() -> String {
    "parallel_kb_builds.mk".to_string()
}

fn default_jobs() -> usize {
    1
}

fn default_true() -> bool {
    true
}

/// Root configuration structure for `multibuild.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultibuildConfig {
    /// Project layout
    #[serde(default)]
    pub project: ProjectConfig,
    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "build.jobs")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "multibuild.toml: '{}' {}", self.field, self.message)
    }
}

impl MultibuildConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        if self.build.jobs == 0 {
            errors.push(ConfigValidationError {
                field: "build.jobs".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        if self.build.keymap.trim().is_empty() {
            errors.push(ConfigValidationError {
                field: "build.keymap".to_string(),
                message: "must be a non-empty string".to_string(),
            });
        }

        if self.build.makefile.as_os_str().is_empty() {
            errors.push(ConfigValidationError {
                field: "build.makefile".to_string(),
                message: "must be a non-empty path".to_string(),
            });
        }

        // The plan lives directly in the build directory
        let plan_file = &self.build.plan_file;
        if plan_file.is_empty() || plan_file.contains('/') || plan_file.contains('\\') {
            errors.push(ConfigValidationError {
                field: "build.plan_file".to_string(),
                message: "must be a bare file name".to_string(),
            });
        }

        if let Some(make) = &self.build.make {
            if make.trim().is_empty() {
                errors.push(ConfigValidationError {
                    field: "build.make".to_string(),
                    message: "must be a non-empty command when set".to_string(),
                });
            }
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
