//! Build command implementations (build, plan, list)

use std::path::Path;
use std::process::ExitCode;

use tracing::{debug, info};

use super::{GlobalArgs, SelectArgs, EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{
    find_make, BuildContext, BuildPipeline, FilterExpression, KeyboardLister, MakeExecutor,
    RunOutcome, DEFAULT_MAKE,
};
use crate::config::loader::{
    find_config_from, load_config, merge_cli_overrides, project_root, CliOverrides,
};
use crate::rules::RulesMkStore;

/// Run the build command
pub fn run_build(
    global: &GlobalArgs,
    select: &SelectArgs,
    jobs: Option<usize>,
    clean: bool,
    keymap: Option<String>,
    make: Option<String>,
    no_color: bool,
) -> ExitCode {
    let overrides = CliOverrides { keymap, jobs, make, color: no_color.then_some(false) };
    let context = match load_context(global, select, &overrides) {
        Ok(ctx) => ctx.with_clean(clean),
        Err(code) => return code,
    };

    let lister = KeyboardLister::new(context.keyboards_dir());
    let store = RulesMkStore::new(context.keyboards_dir());
    let executor = MakeExecutor::from_context(&context, find_make());

    match BuildPipeline::new(&context, &lister, &store, &executor).run() {
        Ok(RunOutcome::NoTargets) => {
            println!("No keyboards matched, nothing to build");
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(RunOutcome::Planned(plan)) | Ok(RunOutcome::Executed(plan)) => {
            info!(targets = plan.len(), "build finished");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the plan command
pub fn run_plan(
    global: &GlobalArgs,
    select: &SelectArgs,
    keymap: Option<String>,
    no_color: bool,
    json: bool,
) -> ExitCode {
    let overrides = CliOverrides { keymap, color: no_color.then_some(false), ..Default::default() };
    let context = match load_context(global, select, &overrides) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let lister = KeyboardLister::new(context.keyboards_dir());
    let store = RulesMkStore::new(context.keyboards_dir());
    // Never invoked in a dry run
    let executor = MakeExecutor::from_context(&context, DEFAULT_MAKE);

    let pipeline = BuildPipeline::new(&context, &lister, &store, &executor).with_dry_run(true);
    let plan = match pipeline.run() {
        Ok(RunOutcome::NoTargets) => {
            println!("No keyboards matched, no plan written");
            return ExitCode::from(EXIT_SUCCESS);
        }
        Ok(RunOutcome::Planned(plan)) | Ok(RunOutcome::Executed(plan)) => plan,
        Err(e) => {
            eprintln!("Plan error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if json {
        match serde_json::to_string_pretty(&plan) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing plan: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!("Wrote plan for {} keyboards to {}", plan.len(), plan.path().display());
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Run the list command
pub fn run_list(global: &GlobalArgs, select: &SelectArgs) -> ExitCode {
    let context = match load_context(global, select, &CliOverrides::default()) {
        Ok(ctx) => ctx,
        Err(code) => return code,
    };

    let lister = KeyboardLister::new(context.keyboards_dir());
    let store = RulesMkStore::new(context.keyboards_dir());
    let executor = MakeExecutor::from_context(&context, DEFAULT_MAKE);

    match BuildPipeline::new(&context, &lister, &store, &executor).select_targets() {
        Ok(mut targets) => {
            targets.sort();
            for target in &targets {
                println!("{}", target);
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Load configuration, apply overrides and build the run's context.
///
/// Errors are reported on stderr; the returned exit code ends the command.
fn load_context(
    global: &GlobalArgs,
    select: &SelectArgs,
    overrides: &CliOverrides,
) -> Result<BuildContext, ExitCode> {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: Cannot read current directory: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };

    let root_arg = global.root.as_deref().map(|root| cwd.join(root));
    let config_path = match &global.config {
        Some(path) => Some(cwd.join(path)),
        None => find_config_from(root_arg.clone().unwrap_or_else(|| cwd.clone())),
    };

    let mut config = match load_config(config_path.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    match &config_path {
        Some(path) => info!(path = %path.display(), "using config"),
        None => debug!("no multibuild.toml found, using defaults"),
    }

    if let Err(e) = merge_cli_overrides(&mut config, overrides) {
        eprintln!("Error: {}", e);
        return Err(ExitCode::from(EXIT_ERROR));
    }

    let root = root_arg
        .or_else(|| config_path.as_deref().and_then(project_root).map(Path::to_path_buf))
        .unwrap_or(cwd);

    Ok(BuildContext::new(config, root).with_filters(cli_filters(select)))
}

/// Filters given on the command line, in application order.
fn cli_filters(select: &SelectArgs) -> Vec<String> {
    let mut filters = select.filters.clone();
    if select.split {
        filters.push(FilterExpression::split_keyboard().to_string());
    }
    filters
}
