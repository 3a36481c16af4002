//! Step runners.
//!
//! A runner is the decision function of one step. It receives an owned
//! [`StepContext`] describing everything it may look at, and answers with a
//! [`StepVerdict`] (or a [`LoaderError`]) plus a list of [`SessionEffect`]s.
//! Runners never touch controller state; the controller applies the outcome
//! only if it is still current.
//!
//! Collaborator calls that outlive an invocation (start, stop, create,
//! devfile update and factory resolution) are not made by runners. They are
//! requested through [`StepVerdict::Request`] and performed by the
//! controller, which records them before any newer snapshot is processed.
//! A newer invocation never aborts them.

pub mod apply;
pub mod check_existing;
pub mod fetch_devfile;
pub mod fetch_resources;
pub mod initialize;
pub mod open;
pub mod prepare;
pub mod running_limit;
pub mod start;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::collaborators::Collaborators;
use crate::config::models::LoaderSettings;
use crate::error::{LoaderError, ResolverError};
use wl_protocol::factory_models::{
    Devfile, FactoryParams, FactoryResolution, PrebuiltResources, WorkspaceDraft,
};
use wl_protocol::ipc::MatchParams;
use wl_protocol::step_models::{FlowKind, LoadingStep};
use wl_protocol::workspace_models::{ClusterSnapshot, WorkspaceParams, WorkspaceSnapshot};

/// Facts of the loading session a runner may depend on.
///
/// Owned by the controller; runners get a copy and change it only through
/// effects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionFacts {
    /// The workspace to start and open once known.
    pub target: Option<WorkspaceParams>,

    /// False once the target has been seen starting or running.
    pub should_start: bool,
    pub start_requested: bool,

    pub resolution: Option<FactoryResolution>,
    pub resources: Option<PrebuiltResources>,
    pub use_default_devfile: bool,

    /// Set once the resolver was asked; the answer lands in one of the
    /// replies below.
    pub resolve_requested: bool,
    pub devfile_reply: Option<Result<FactoryResolution, ResolverError>>,
    pub resources_reply: Option<Result<PrebuiltResources, ResolverError>>,

    pub draft: Option<WorkspaceDraft>,
    pub create_requested: bool,
    pub create_failed: bool,
    pub create_new_confirmed: bool,

    /// Running workspace the user chose to stop to stay within the limit.
    pub redundant_workspace: Option<WorkspaceParams>,
    pub stop_requested: bool,

    /// Replace the devfile of the target with the default one before
    /// starting it.
    pub update_with_default_devfile: bool,
    pub devfile_update_pending: bool,
}

impl SessionFacts {
    pub fn new(params: &MatchParams) -> Self {
        let target = match params {
            MatchParams::Workspace(params) => Some(params.clone()),
            MatchParams::Factory(_) => None,
        };
        Self {
            target,
            should_start: true,
            ..Self::default()
        }
    }
}

/// A change to the session requested by a runner.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    SetTitle(String),
    /// Rewrites the title to `Warning: <text>` and flags the step.
    SetWarning(String),
    SetTarget(WorkspaceParams),
    ShouldStart(bool),
    StoreResolution(FactoryResolution),
    StoreResources(PrebuiltResources),
    RecordReload(String),
    ClearReloads,
}

/// A collaborator call performed by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum CollaboratorCall {
    Start(WorkspaceParams),
    Stop(WorkspaceParams),
    Create {
        namespace: String,
        draft: WorkspaceDraft,
    },
    UpdateDevfile {
        workspace: WorkspaceParams,
        devfile: Devfile,
    },
    ResolveDevfile(FactoryParams),
    FetchResources(String),
}

/// A wait for the next snapshot, optionally bounded.
#[derive(Debug, Clone, PartialEq)]
pub struct WaitSpec {
    /// Waits of the same step with the same name share one deadline.
    pub name: &'static str,
    pub budget: Option<Duration>,
    pub on_timeout: Option<LoaderError>,
    /// Re-run the step after this delay even without a new snapshot.
    pub recheck_after: Option<Duration>,
}

impl WaitSpec {
    pub fn bounded(name: &'static str, budget: Duration, on_timeout: LoaderError) -> Self {
        Self {
            name,
            budget: Some(budget),
            on_timeout: Some(on_timeout),
            recheck_after: None,
        }
    }

    /// Waits for a new snapshot or a user action without a deadline.
    pub fn unbounded(name: &'static str) -> Self {
        Self {
            name,
            budget: None,
            on_timeout: None,
            recheck_after: None,
        }
    }

    pub fn recheck_after(mut self, delay: Duration) -> Self {
        self.recheck_after = Some(delay);
        self
    }
}

/// What a runner decided.
#[derive(Debug, Clone, PartialEq)]
pub enum StepVerdict {
    Advance,
    Wait(WaitSpec),
    /// Perform `call`, then wait.
    Request { call: CollaboratorCall, then: WaitSpec },
    /// The IDE is ready. Terminal.
    Navigate(String),
    /// Authentication is required. Suspends the session.
    Redirect {
        authentication_url: String,
        redirect_url: String,
    },
}

/// Result of one runner invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub result: Result<StepVerdict, LoaderError>,
    pub effects: Vec<SessionEffect>,
}

/// Everything a runner may read.
#[derive(Clone)]
pub struct StepContext {
    pub step: LoadingStep,
    pub step_index: usize,
    /// When the session moved to this step.
    pub entered_at: Instant,
    /// Current title of the step.
    pub title: String,
    pub params: MatchParams,
    pub snapshot: Arc<ClusterSnapshot>,
    pub settings: LoaderSettings,
    pub facts: SessionFacts,
    /// Error lines recorded for the target workspace, oldest first.
    pub error_lines: Vec<String>,
    /// Devfile used when continuing with the default configuration.
    pub default_devfile: Option<Devfile>,
    pub collaborators: Collaborators,
}

impl StepContext {
    pub fn flow(&self) -> FlowKind {
        self.params.flow_kind()
    }

    pub fn factory_params(&self) -> Option<&FactoryParams> {
        match &self.params {
            MatchParams::Factory(params) => Some(params),
            MatchParams::Workspace(_) => None,
        }
    }

    /// The target workspace as seen in the snapshot.
    ///
    /// # Errors
    ///
    /// Fails when the target is unknown or missing from the snapshot.
    pub fn target_workspace(&self) -> Result<&WorkspaceSnapshot, LoaderError> {
        let target = self
            .facts
            .target
            .as_ref()
            .ok_or_else(|| LoaderError::upstream("Cannot determine the workspace to start."))?;

        self.snapshot
            .find(target)
            .ok_or_else(|| LoaderError::WorkspaceNotFound(target.clone()))
    }

    /// The most specific failure reason recorded for the target.
    pub fn last_error_line(&self) -> Option<String> {
        self.error_lines.last().cloned()
    }

    pub fn default_devfile(&self) -> Option<&Devfile> {
        self.default_devfile
            .as_ref()
            .or(self.snapshot.default_devfile.as_ref())
    }
}

#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError>;
}

/// The `CreateWorkspace` group step has nothing to do on its own.
pub struct CreateWorkspaceRunner;

#[async_trait]
impl StepRunner for CreateWorkspaceRunner {
    async fn run(
        &self,
        _ctx: &StepContext,
        _effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        Ok(StepVerdict::Advance)
    }
}

/// Maps a step to its runner.
pub fn runner_for(step: LoadingStep) -> &'static dyn StepRunner {
    match step {
        LoadingStep::Initialize => &initialize::InitializeRunner,
        LoadingStep::CheckRunningWorkspacesLimit => &running_limit::RunningLimitRunner,
        LoadingStep::CreateWorkspace => &CreateWorkspaceRunner,
        LoadingStep::CreateWorkspaceFetchDevfile => &fetch_devfile::FetchDevfileRunner,
        LoadingStep::CreateWorkspaceFetchResources => &fetch_resources::FetchResourcesRunner,
        LoadingStep::CreateWorkspaceCheckExistingWorkspaces => {
            &check_existing::CheckExistingRunner
        }
        LoadingStep::CreateWorkspaceApplyDevfile => &apply::ApplyDevfileRunner,
        LoadingStep::CreateWorkspaceApplyResources => &apply::ApplyResourcesRunner,
        LoadingStep::StartWorkspace => &start::StartWorkspaceRunner,
        LoadingStep::OpenWorkspace => &open::OpenWorkspaceRunner,
    }
}

/// Runs the step of `ctx` once it has been shown for the minimum step
/// duration.
pub async fn run_step(ctx: StepContext) -> StepOutcome {
    tokio::time::sleep_until(ctx.entered_at + ctx.settings.min_step_duration).await;

    debug!(step = ?ctx.step, index = ctx.step_index, "running step");

    let mut effects = Vec::new();
    let result = runner_for(ctx.step).run(&ctx, &mut effects).await;

    StepOutcome { result, effects }
}
