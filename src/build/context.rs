//! Build context containing configuration and state for a run.

use crate::config::MultibuildConfig;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a multibuild run.
///
/// Everything the filter engine, plan generator and executor need is read
/// from here; nothing consults the process environment after construction.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: MultibuildConfig,
    /// Firmware root (where multibuild.toml lives)
    project_root: PathBuf,
    /// Raw filter expressions, config-file filters first
    filters: Vec<String>,
    /// Whether to run `make clean` before planning
    clean: bool,
}

impl BuildContext {
    /// Create a new build context.
    ///
    /// Filters declared in the configuration are carried over; command-line
    /// filters are appended with [`BuildContext::with_filters`].
    pub fn new(config: MultibuildConfig, project_root: PathBuf) -> Self {
        let filters = config.build.filters.clone();
        Self { config, project_root, filters, clean: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MultibuildConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Directory holding keyboard definitions.
    pub fn keyboards_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.keyboards)
    }

    /// Build output directory.
    pub fn build_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.build_dir)
    }

    /// Location of the generated plan document.
    pub fn plan_path(&self) -> PathBuf {
        self.build_dir().join(&self.config.build.plan_file)
    }

    /// Per-keyboard makefile invoked by each rule.
    pub fn makefile_path(&self) -> PathBuf {
        self.resolve_path(&self.config.build.makefile)
    }

    /// Keymap compiled for every target.
    pub fn keymap(&self) -> &str {
        &self.config.build.keymap
    }

    /// Number of parallel jobs handed to the executor.
    pub fn jobs(&self) -> usize {
        self.config.build.jobs
    }

    /// Whether status lines are colorized.
    pub fn color(&self) -> bool {
        self.config.build.color
    }

    /// Explicitly configured make executable, if any.
    pub fn make(&self) -> Option<&str> {
        self.config.build.make.as_deref()
    }

    /// Raw filter expressions in application order.
    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    /// Whether the pre-clean step is enabled.
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Append filter expressions after the configured ones.
    pub fn with_filters<I, S>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters.extend(filters.into_iter().map(Into::into));
        self
    }

    /// Enable the pre-clean step.
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::resolve_path(&self.project_root, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;

    #[test]
    fn test_build_context_new() {
        let config = default_config();
        let root = PathBuf::from("/firmware");
        let ctx = BuildContext::new(config, root.clone());

        assert_eq!(ctx.project_root(), &root);
        assert!(!ctx.is_clean());
        assert!(ctx.filters().is_empty());
        assert_eq!(ctx.jobs(), 1);
        assert_eq!(ctx.keymap(), "default");
        assert!(ctx.color());
        assert!(ctx.make().is_none());
    }

    #[test]
    fn test_build_context_paths() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/firmware"));

        assert_eq!(ctx.keyboards_dir(), PathBuf::from("/firmware/keyboards"));
        assert_eq!(ctx.build_dir(), PathBuf::from("/firmware/.build"));
        assert_eq!(ctx.plan_path(), PathBuf::from("/firmware/.build/parallel_kb_builds.mk"));
        assert_eq!(ctx.makefile_path(), PathBuf::from("/firmware/build_keyboard.mk"));
    }

    #[test]
    fn test_build_context_absolute_build_dir() {
        let mut config = default_config();
        config.project.build_dir = PathBuf::from("/tmp/out");
        let ctx = BuildContext::new(config, PathBuf::from("/firmware"));

        assert_eq!(ctx.build_dir(), PathBuf::from("/tmp/out"));
        assert_eq!(ctx.plan_path(), PathBuf::from("/tmp/out/parallel_kb_builds.mk"));
    }

    #[test]
    fn test_build_context_config_filters_come_first() {
        let mut config = default_config();
        config.build.filters = vec!["SPLIT_KEYBOARD=yes".to_string()];
        let ctx = BuildContext::new(config, PathBuf::from("/firmware"))
            .with_filters(vec!["MCU=STM32F303".to_string()]);

        assert_eq!(ctx.filters(), &["SPLIT_KEYBOARD=yes".to_string(), "MCU=STM32F303".to_string()]);
    }

    #[test]
    fn test_build_context_with_clean() {
        let ctx = BuildContext::new(default_config(), PathBuf::from("/firmware")).with_clean(true);
        assert!(ctx.is_clean());
    }
}
