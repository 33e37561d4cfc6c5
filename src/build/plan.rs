//! Build plan generation.
//!
//! The plan is plain data: one [`BuildRule`] per target describing the
//! sub-make invocation and the files the rule owns. Turning it into
//! Makefile syntax is the job of [`crate::build::makefile`].

use crate::build::{makefile, BuildContext, SafeId, Target};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Name of the umbrella rule every target rule hangs off.
pub const ROOT_RULE: &str = "all";

/// Error while generating or writing a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Two targets map to the same safe identifier
    #[error("Targets '{first}' and '{second}' both map to '{safe_id}'")]
    SafeIdCollision {
        /// Target seen first (in sorted order)
        first: Target,
        /// Target that collided with it
        second: Target,
        /// Shared safe identifier
        safe_id: SafeId,
    },
    /// Target identifier cannot be written into a Makefile
    #[error("Target '{target}' contains unsupported character {ch:?}")]
    InvalidTarget {
        /// Offending target
        target: Target,
        /// First unsupported character
        ch: char,
    },
    /// Path cannot be written into a Makefile unchanged
    #[error("Path is not valid UTF-8: {}", .path.display())]
    NonUtf8Path {
        /// Offending path
        path: PathBuf,
    },
    /// IO error while writing the plan
    #[error("Failed to write plan {}: {source}", .path.display())]
    Io {
        /// Plan file or build directory
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

/// The per-target build step: a recursive make of the keyboard makefile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubMake {
    /// Directory make changes into (`-C`)
    pub directory: PathBuf,
    /// Makefile to run (`-f`)
    pub makefile: PathBuf,
    /// Variables passed on the command line, in order
    pub variables: Vec<(String, String)>,
}

/// Everything needed to build and report one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildRule {
    /// Target being built
    pub target: Target,
    /// Safe identifier used in rule and file names
    pub safe_id: SafeId,
    /// Make rule name
    pub name: String,
    /// Name shown in the status line (`keyboard:keymap`)
    pub display_name: String,
    /// Build step
    pub build: SubMake,
    /// Combined stdout/stderr of the build step
    pub log: PathBuf,
    /// Copy of the log, written only when the build step fails
    pub failure_marker: PathBuf,
}

/// Independent per-target rules under one umbrella rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    /// Umbrella rule name
    root: String,
    /// Colorize status lines
    color: bool,
    /// Rules, sorted by target
    rules: Vec<BuildRule>,
    /// Where the plan is written
    #[serde(skip)]
    path: PathBuf,
}

impl BuildPlan {
    /// Umbrella rule name.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether status lines are colorized.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Rules in plan order.
    pub fn rules(&self) -> &[BuildRule] {
        &self.rules
    }

    /// Targets in plan order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.rules.iter().map(|r| &r.target)
    }

    /// Destination of the plan document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the plan has no rules. Generated plans never are.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Turns a filtered target set into a [`BuildPlan`].
pub struct PlanGenerator<'a> {
    context: &'a BuildContext,
}

impl<'a> PlanGenerator<'a> {
    /// Create a generator reading paths and settings from `context`.
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context }
    }

    /// Generate the plan for `targets`.
    ///
    /// Targets are sorted and de-duplicated first, so the result only
    /// depends on the set of targets. Returns `Ok(None)` for an empty set.
    pub fn generate(&self, mut targets: Vec<Target>) -> Result<Option<BuildPlan>, PlanError> {
        targets.sort();
        targets.dedup();

        if targets.is_empty() {
            debug!("no targets to plan");
            return Ok(None);
        }

        let ctx = self.context;
        for path in [
            ctx.project_root().to_path_buf(),
            ctx.makefile_path(),
            ctx.build_dir(),
            ctx.plan_path(),
        ] {
            require_utf8(path)?;
        }

        let mut seen: HashMap<SafeId, &Target> = HashMap::with_capacity(targets.len());
        for target in &targets {
            if let Some(ch) = target.invalid_char() {
                return Err(PlanError::InvalidTarget { target: target.clone(), ch });
            }
            let safe_id = target.safe_id();
            if let Some(first) = seen.insert(safe_id.clone(), target) {
                return Err(PlanError::SafeIdCollision {
                    first: first.clone(),
                    second: target.clone(),
                    safe_id,
                });
            }
        }

        let rules = targets.iter().map(|t| self.rule(t)).collect();
        Ok(Some(BuildPlan {
            root: ROOT_RULE.to_string(),
            color: self.context.color(),
            rules,
            path: self.context.plan_path(),
        }))
    }

    /// Write a plan to its destination, replacing any previous plan.
    ///
    /// Creates the build directory if needed and returns the plan path.
    pub fn write(&self, plan: &BuildPlan) -> Result<PathBuf, PlanError> {
        let build_dir = self.context.build_dir();
        fs::create_dir_all(&build_dir)
            .map_err(|source| PlanError::Io { path: build_dir.clone(), source })?;

        let path = plan.path().to_path_buf();
        fs::write(&path, makefile::render(plan))
            .map_err(|source| PlanError::Io { path: path.clone(), source })?;

        info!(path = %path.display(), rules = plan.len(), "wrote build plan");
        Ok(path)
    }

    fn rule(&self, target: &Target) -> BuildRule {
        let ctx = self.context;
        let safe_id = target.safe_id();
        let build_dir = ctx.build_dir();
        let color = if ctx.color() { "true" } else { "false" };

        BuildRule {
            name: format!("{}_binary", safe_id),
            display_name: format!("{}:{}", target, ctx.keymap()),
            build: SubMake {
                directory: ctx.project_root().to_path_buf(),
                makefile: ctx.makefile_path(),
                variables: vec![
                    ("KEYBOARD".to_string(), target.to_string()),
                    ("KEYMAP".to_string(), ctx.keymap().to_string()),
                    ("REQUIRE_PLATFORM_KEY".to_string(), String::new()),
                    ("COLOR".to_string(), color.to_string()),
                    ("SILENT".to_string(), "false".to_string()),
                ],
            },
            log: build_dir.join(format!("build.log.{}", safe_id)),
            failure_marker: build_dir.join(format!("failed.log.{}", safe_id)),
            target: target.clone(),
            safe_id,
        }
    }
}

/// Reject paths that would be altered by a lossy conversion to text.
fn require_utf8(path: PathBuf) -> Result<(), PlanError> {
    match path.to_str() {
        Some(_) => Ok(()),
        None => Err(PlanError::NonUtf8Path { path }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_config;
    use tempfile::TempDir;

    fn context() -> BuildContext {
        BuildContext::new(default_config(), PathBuf::from("/fw"))
    }

    fn targets(ids: &[&str]) -> Vec<Target> {
        ids.iter().map(|id| Target::new(*id)).collect()
    }

    #[test]
    fn test_generate_empty_is_noop() {
        let ctx = context();
        assert!(PlanGenerator::new(&ctx).generate(vec![]).unwrap().is_none());
    }

    #[test]
    fn test_generate_sorts_and_dedups() {
        let ctx = context();
        let plan = PlanGenerator::new(&ctx)
            .generate(targets(&["kb/c", "kb/a", "kb/c", "kb/b"]))
            .unwrap()
            .unwrap();

        let ids: Vec<_> = plan.targets().map(Target::id).collect();
        assert_eq!(ids, vec!["kb/a", "kb/b", "kb/c"]);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_generate_rule_contents() {
        let ctx = context();
        let plan = PlanGenerator::new(&ctx).generate(targets(&["planck/rev6"])).unwrap().unwrap();
        let rule = &plan.rules()[0];

        assert_eq!(plan.root(), "all");
        assert_eq!(plan.path(), PathBuf::from("/fw/.build/parallel_kb_builds.mk"));
        assert_eq!(rule.name, "planck+rev6_binary");
        assert_eq!(rule.display_name, "planck/rev6:default");
        assert_eq!(rule.log, PathBuf::from("/fw/.build/build.log.planck+rev6"));
        assert_eq!(rule.failure_marker, PathBuf::from("/fw/.build/failed.log.planck+rev6"));
        assert_eq!(rule.build.directory, PathBuf::from("/fw"));
        assert_eq!(rule.build.makefile, PathBuf::from("/fw/build_keyboard.mk"));
        assert_eq!(rule.build.variables[0], ("KEYBOARD".to_string(), "planck/rev6".to_string()));
        assert_eq!(rule.build.variables[1], ("KEYMAP".to_string(), "default".to_string()));
    }

    #[test]
    fn test_generate_uses_configured_keymap() {
        let mut config = default_config();
        config.build.keymap = "via".to_string();
        config.build.color = false;
        let ctx = BuildContext::new(config, PathBuf::from("/fw"));

        let plan = PlanGenerator::new(&ctx).generate(targets(&["kb"])).unwrap().unwrap();
        let rule = &plan.rules()[0];
        assert_eq!(rule.display_name, "kb:via");
        assert!(rule.build.variables.contains(&("COLOR".to_string(), "false".to_string())));
        assert!(!plan.color());
    }

    #[test]
    fn test_generate_detects_safe_id_collision() {
        let ctx = context();
        let result = PlanGenerator::new(&ctx).generate(targets(&["kb/rev1", "kb+rev1"]));

        match result {
            Err(PlanError::SafeIdCollision { first, second, safe_id }) => {
                assert_eq!(first.id(), "kb+rev1");
                assert_eq!(second.id(), "kb/rev1");
                assert_eq!(safe_id.as_str(), "kb+rev1");
            }
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_generate_rejects_unsafe_target() {
        let ctx = context();
        let result = PlanGenerator::new(&ctx).generate(targets(&["kb/ok", "bad name"]));
        assert!(matches!(result, Err(PlanError::InvalidTarget { ch: ' ', .. })));
    }

    #[test]
    fn test_generate_rejects_make_syntax_in_target() {
        // `kb|x: ...` would declare an order-only prerequisite on `kb`
        let ctx = context();
        for (id, bad) in [("kb|x", '|'), ("kb(x)", '('), ("kb*", '*'), ("kb&x", '&')] {
            match PlanGenerator::new(&ctx).generate(targets(&["kb/ok", id])) {
                Err(PlanError::InvalidTarget { target, ch }) => {
                    assert_eq!(target.id(), id);
                    assert_eq!(ch, bad);
                }
                other => panic!("expected invalid target for {}, got {:?}", id, other),
            }
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_rejects_non_utf8_root() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = PathBuf::from(OsStr::from_bytes(b"/fw/\xffboards"));
        let ctx = BuildContext::new(default_config(), root.clone());

        match PlanGenerator::new(&ctx).generate(targets(&["kb/a"])) {
            Err(PlanError::NonUtf8Path { path }) => assert_eq!(path, root),
            other => panic!("expected non-UTF-8 path error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_rejects_non_utf8_build_dir() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let mut config = default_config();
        config.project.build_dir = PathBuf::from(OsStr::from_bytes(b"out\xfe"));
        let ctx = BuildContext::new(config, PathBuf::from("/fw"));

        let result = PlanGenerator::new(&ctx).generate(targets(&["kb/a"]));
        assert!(matches!(result, Err(PlanError::NonUtf8Path { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_empty_set_ignores_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let root = PathBuf::from(OsStr::from_bytes(b"/fw/\xff"));
        let ctx = BuildContext::new(default_config(), root);
        assert!(PlanGenerator::new(&ctx).generate(vec![]).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_build_dir_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(default_config(), temp.path().to_path_buf());
        let generator = PlanGenerator::new(&ctx);

        let first = generator.generate(targets(&["kb/a", "kb/b"])).unwrap().unwrap();
        let path = generator.write(&first).unwrap();
        assert_eq!(path, temp.path().join(".build/parallel_kb_builds.mk"));
        assert!(fs::read_to_string(&path).unwrap().contains("kb+b_binary"));

        let second = generator.generate(targets(&["kb/a"])).unwrap().unwrap();
        generator.write(&second).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("kb+a_binary"));
        assert!(!contents.contains("kb+b_binary"));
    }

    #[test]
    fn test_plan_serializes_to_json() {
        let ctx = context();
        let plan = PlanGenerator::new(&ctx).generate(targets(&["kb/a"])).unwrap().unwrap();
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["root"], "all");
        assert_eq!(json["rules"][0]["target"], "kb/a");
        assert_eq!(json["rules"][0]["safe_id"], "kb+a");
    }
}
