//! Build pipeline orchestration.
//!
//! A run goes clean (optional), list, filter, plan, write, execute. Every
//! collaborator is passed in, so the pipeline itself never touches the
//! process environment.

use crate::build::{
    BuildContext, BuildPlan, DiscoveryError, ExecutorError, FilterEngine, FilterSet, PlanError,
    PlanExecutor, PlanGenerator, Target, TargetLister,
};
use crate::rules::{ConfigStore, StoreError};
use thiserror::Error;
use tracing::{debug, info};

/// Error during a build run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Discovery error
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    /// Attribute lookup error
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Plan generation or writing error
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// make could not run the plan
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No target survived the filters; nothing was written or executed
    NoTargets,
    /// The plan was written but not executed (dry run)
    Planned(BuildPlan),
    /// The plan was written and make ran it to completion
    Executed(BuildPlan),
}

impl RunOutcome {
    /// The plan of the run, if one was generated.
    pub fn plan(&self) -> Option<&BuildPlan> {
        match self {
            RunOutcome::NoTargets => None,
            RunOutcome::Planned(plan) | RunOutcome::Executed(plan) => Some(plan),
        }
    }
}

/// Build pipeline for a multibuild run.
pub struct BuildPipeline<'a> {
    /// Build context
    context: &'a BuildContext,
    /// Source of the target universe
    lister: &'a dyn TargetLister,
    /// Attribute lookup for filtering
    store: &'a dyn ConfigStore,
    /// Runs clean and the plan
    executor: &'a dyn PlanExecutor,
    /// Write the plan without running it
    dry_run: bool,
}

impl<'a> BuildPipeline<'a> {
    /// Create a new build pipeline.
    pub fn new(
        context: &'a BuildContext,
        lister: &'a dyn TargetLister,
        store: &'a dyn ConfigStore,
        executor: &'a dyn PlanExecutor,
    ) -> Self {
        Self { context, lister, store, executor, dry_run: false }
    }

    /// Set dry-run mode (write the plan, don't execute it).
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run the pipeline.
    ///
    /// Returns once make has finished with every target. Per-target build
    /// failures do not make the run fail; only make itself failing does.
    pub fn run(&self) -> Result<RunOutcome, BuildError> {
        if self.context.is_clean() && !self.dry_run {
            self.executor.clean()?;
        }

        let targets = self.select_targets()?;

        let generator = PlanGenerator::new(self.context);
        let Some(plan) = generator.generate(targets)? else {
            info!("no keyboards matched the filters, nothing to build");
            return Ok(RunOutcome::NoTargets);
        };
        generator.write(&plan)?;

        if self.dry_run {
            debug!("dry run, skipping plan execution");
            return Ok(RunOutcome::Planned(plan));
        }

        self.executor.execute(plan.path(), self.context.jobs())?;
        Ok(RunOutcome::Executed(plan))
    }

    /// List the universe and apply the context's filters.
    ///
    /// Targets keep the order the lister produced them in.
    pub fn select_targets(&self) -> Result<Vec<Target>, BuildError> {
        let universe = self.lister.list_all()?;
        let filters = FilterSet::parse(self.context.filters());
        debug!(universe = universe.len(), filters = filters.len(), "selecting targets");

        Ok(FilterEngine::new(self.store).apply(universe, &filters)?)
    }
}
