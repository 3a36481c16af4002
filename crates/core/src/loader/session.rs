//! State of one loading session, owned by the controller.
//!
//! Everything here is synchronous. The controller decides when to call
//! into the session; the session only keeps the step list, the current
//! index and the facts consistent.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::collaborators::{Collaborators, ReloadTracker};
use crate::config::models::LoaderSettings;
use crate::error::{FailureKind, LoaderError};
use crate::loader::alerts::build_alert;
use crate::logs::WorkspaceLogs;
use crate::runners::{SessionEffect, SessionFacts, StepContext};
use crate::steps::{build_steps, to_display_tree, StepList};
use wl_protocol::alert_models::AlertItem;
use wl_protocol::config_models::LoaderConfig;
use wl_protocol::factory_models::Devfile;
use wl_protocol::ipc::{LoaderView, MatchParams};
use wl_protocol::step_models::{LoaderStep, LoaderTab};
use wl_protocol::workspace_models::{ClusterSnapshot, WorkspaceParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for `Op::Start`.
    Idle,
    /// The current step is being driven.
    Active,
    /// The current step failed; waiting for a user action.
    Failed,
    /// Waiting for the user to come back from authentication.
    Suspended,
    /// The IDE was opened or the user left the loader.
    Finished,
}

pub struct LoaderSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    params: MatchParams,
    steps: StepList,
    index: usize,
    entered_at: Instant,
    last_error: Option<LoaderError>,
    alert: Option<AlertItem>,
    tab: LoaderTab,
    phase: Phase,
    snapshot: Arc<ClusterSnapshot>,
    logs: WorkspaceLogs,
    pub facts: SessionFacts,
}

impl LoaderSession {
    pub fn new(params: MatchParams) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps: build_steps(params.flow_kind()),
            index: 0,
            entered_at: Instant::now(),
            last_error: None,
            alert: None,
            tab: LoaderTab::default(),
            phase: Phase::Idle,
            snapshot: Arc::new(ClusterSnapshot::default()),
            logs: WorkspaceLogs::new(),
            facts: SessionFacts::new(&params),
            params,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_step(&self) -> Option<&LoaderStep> {
        self.steps.get(self.index)
    }

    pub fn last_error(&self) -> Option<&LoaderError> {
        self.last_error.as_ref()
    }

    pub fn snapshot(&self) -> &ClusterSnapshot {
        &self.snapshot
    }

    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Active;
            self.entered_at = Instant::now();
        }
    }

    pub fn set_tab(&mut self, tab: LoaderTab) {
        self.tab = tab;
    }

    pub fn suspend(&mut self) {
        self.phase = Phase::Suspended;
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
    }

    /// Replaces the snapshot. Returns false when nothing changed.
    pub fn set_snapshot(&mut self, snapshot: ClusterSnapshot) -> bool {
        if *self.snapshot == snapshot {
            return false;
        }
        self.snapshot = Arc::new(snapshot);
        true
    }

    /// Records the status message of the target workspace.
    ///
    /// Returns the log key and line when something was recorded.
    pub fn record_target_status(&mut self) -> Option<(String, String)> {
        let target = self.facts.target.as_ref()?;
        let workspace = self.snapshot.find(target)?;
        let line = self.logs.record_status(workspace)?;
        Some((workspace.log_key(), line))
    }

    pub fn append_log(&mut self, workspace_id: &str, message: &str) -> bool {
        self.logs.append(workspace_id, message)
    }

    /// Drops the lines of `workspace` under its runtime id and its
    /// `namespace/name` key.
    pub fn clear_logs(&mut self, workspace: &WorkspaceParams) {
        if let Some(found) = self.snapshot.find(workspace) {
            self.logs.clear(&found.log_key());
        }
        self.logs.clear(&workspace.to_string());
    }

    /// Error lines of the target workspace, oldest first.
    pub fn error_lines(&self) -> Vec<String> {
        let Some(target) = &self.facts.target else {
            return Vec::new();
        };
        let fallback_key = target.to_string();
        let mut lines = Vec::new();

        if let Some(workspace) = self.snapshot.find(target) {
            let key = workspace.log_key();
            if key != fallback_key {
                lines.extend(self.logs.error_lines(&key));
            }
        }
        lines.extend(self.logs.error_lines(&fallback_key));
        lines
    }

    pub fn log_lines(&self, workspace_id: &str) -> &[String] {
        self.logs.lines(workspace_id)
    }

    /// Builds the runner context of the current step.
    pub fn context(
        &self,
        config: &LoaderConfig,
        default_devfile: Option<&Devfile>,
        collaborators: &Collaborators,
    ) -> Option<StepContext> {
        let step = self.current_step()?;
        Some(StepContext {
            step: step.id,
            step_index: self.index,
            entered_at: self.entered_at,
            title: step.title.clone(),
            params: self.params.clone(),
            snapshot: Arc::clone(&self.snapshot),
            settings: LoaderSettings::resolve(config, &self.snapshot.server_settings),
            facts: self.facts.clone(),
            error_lines: self.error_lines(),
            default_devfile: default_devfile.cloned(),
            collaborators: collaborators.clone(),
        })
    }

    pub fn apply_effects(&mut self, effects: Vec<SessionEffect>, reloads: &dyn ReloadTracker) {
        for effect in effects {
            match effect {
                SessionEffect::SetTitle(title) => {
                    if let Some(step) = self.steps.get_mut(self.index) {
                        step.title = title;
                    }
                }
                SessionEffect::SetWarning(text) => {
                    if let Some(step) = self.steps.get_mut(self.index) {
                        step.title = format!("Warning: {text}");
                        step.has_warning = true;
                    }
                }
                SessionEffect::SetTarget(target) => self.facts.target = Some(target),
                SessionEffect::ShouldStart(value) => self.facts.should_start = value,
                SessionEffect::StoreResolution(resolution) => {
                    self.facts.resolution = Some(resolution)
                }
                SessionEffect::StoreResources(resources) => self.facts.resources = Some(resources),
                SessionEffect::RecordReload(url) => reloads.increment(&url),
                SessionEffect::ClearReloads => reloads.clear(),
            }
        }
    }

    /// Moves to the next step. Returns false when the current step is the
    /// last one.
    pub fn advance(&mut self) -> bool {
        if !self.steps.has_next(self.index) {
            return false;
        }
        self.index += 1;
        self.entered_at = Instant::now();
        true
    }

    /// Attaches `error` to the current step and raises its alert.
    pub fn fail(&mut self, error: LoaderError) {
        let Some(step) = self.steps.get_mut(self.index) else {
            return;
        };

        if error.kind() == FailureKind::Warning {
            step.has_warning = true;
        } else {
            step.has_error = true;
        }

        self.alert = Some(build_alert(&error, self.params.flow_kind(), step.id));
        self.last_error = Some(error);
        self.phase = Phase::Failed;
    }

    /// Clears the failure of the current step so it can run again.
    pub fn clear_error(&mut self) {
        if let Some(step) = self.steps.get_mut(self.index) {
            step.has_error = false;
            step.has_warning = false;
        }
        self.last_error = None;
        self.alert = None;
        if matches!(self.phase, Phase::Failed | Phase::Suspended) {
            self.phase = Phase::Active;
        }
    }

    /// Drops all progress. The reload counter is not part of the session
    /// and survives.
    pub fn restart(&mut self, tab: Option<LoaderTab>) {
        self.steps = build_steps(self.params.flow_kind());
        self.index = 0;
        self.entered_at = Instant::now();
        self.last_error = None;
        self.alert = None;
        self.logs.clear_all();
        self.facts = SessionFacts::new(&self.params);
        self.phase = Phase::Active;
        if let Some(tab) = tab {
            self.tab = tab;
        }
    }

    pub fn view(&self) -> LoaderView {
        LoaderView {
            session_id: self.id,
            started_at: self.started_at,
            current_step_index: self.index,
            steps: self.steps.as_slice().to_vec(),
            tree: to_display_tree(self.index, self.steps.as_slice()),
            alert: self.alert.clone(),
            tab: self.tab,
        }
    }
}
