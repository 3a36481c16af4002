//! The loader controller actor.
//!
//! The controller owns the [`LoaderSession`] and is the only place where it
//! changes. It processes [`Op`]s in arrival order and internal signals
//! (runner outcomes, timeouts, results of collaborator calls) in between.
//!
//! Every runner invocation is tagged with a generation number. A newer
//! invocation aborts the previous one, and an outcome whose generation is
//! no longer current is discarded without touching the session. Results of
//! collaborator calls are tagged with the session epoch, which changes on
//! restart.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::collaborators::Collaborators;
use crate::config::models::AppConfig;
use crate::error::{LoaderError, ResolverError};
use crate::loader::session::{LoaderSession, Phase};
use crate::runners::{
    run_step, CollaboratorCall, SessionFacts, StepOutcome, StepVerdict, WaitSpec,
};
use crate::timer::{schedule, Armed, Tick, WaitKey, WaitTimer};
use wl_protocol::alert_models::AlertActionKind;
use wl_protocol::config_models::LoaderConfig;
use wl_protocol::factory_models::{
    CreateRequest, Devfile, FactoryResolution, PrebuiltResources,
};
use wl_protocol::ipc::{Event, MatchParams, Op};
use wl_protocol::step_models::LoaderTab;
use wl_protocol::workspace_models::WorkspaceParams;

/// Capacity of the channels created by [`spawn_loader`].
pub const CHANNEL_CAPACITY: usize = 256;

/// Static inputs of a controller.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    pub config: LoaderConfig,
    pub default_devfile: Option<Devfile>,
}

impl From<&AppConfig> for LoaderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            config: config.loader.clone(),
            default_devfile: config.default_devfile.clone(),
        }
    }
}

/// Answer of the factory resolver.
#[derive(Debug)]
enum ResolverReply {
    Devfile(Result<FactoryResolution, ResolverError>),
    Resources(Result<PrebuiltResources, ResolverError>),
}

/// Internal messages delivered to the controller loop.
#[derive(Debug)]
enum Signal {
    Outcome {
        generation: u64,
        outcome: StepOutcome,
    },
    Timeout(Tick),
    Recheck {
        generation: u64,
    },
    Created {
        epoch: u64,
        workspace: WorkspaceParams,
    },
    DevfileUpdated {
        epoch: u64,
        step_index: usize,
    },
    Resolved {
        epoch: u64,
        step_index: usize,
        reply: ResolverReply,
    },
    CallFailed {
        epoch: u64,
        step_index: usize,
        call: CollaboratorCall,
        error: LoaderError,
    },
}

pub struct LoaderController {
    session: LoaderSession,
    options: LoaderOptions,
    collaborators: Collaborators,
    events_tx: mpsc::Sender<Event>,

    signal_tx: mpsc::UnboundedSender<Signal>,
    signal_rx: Option<mpsc::UnboundedReceiver<Signal>>,

    timer: WaitTimer<Signal>,
    /// Error raised if the pending wait times out.
    timeout_error: Option<LoaderError>,

    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    recheck: Option<JoinHandle<()>>,

    epoch: u64,
    calls: Vec<JoinHandle<()>>,
}

impl LoaderController {
    pub fn new(
        params: MatchParams,
        options: LoaderOptions,
        collaborators: Collaborators,
        events_tx: mpsc::Sender<Event>,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let timer = WaitTimer::new(signal_tx.clone(), Signal::Timeout);

        Self {
            session: LoaderSession::new(params),
            options,
            collaborators,
            events_tx,
            signal_tx,
            signal_rx: Some(signal_rx),
            timer,
            timeout_error: None,
            generation: 0,
            in_flight: None,
            recheck: None,
            epoch: 0,
            calls: Vec::new(),
        }
    }

    /// Runs the controller until `Op::Shutdown` is received or the
    /// operation channel is closed.
    pub async fn run(mut self, mut ops: mpsc::Receiver<Op>) {
        let Some(mut signals) = self.signal_rx.take() else {
            return;
        };

        loop {
            tokio::select! {
                biased;

                op = ops.recv() => match op {
                    Some(Op::Shutdown) | None => break,
                    Some(op) => self.handle_op(op).await,
                },
                Some(signal) = signals.recv() => self.handle_signal(signal).await,
            }
        }

        debug!("loader controller shutting down");
        self.cancel_all();
    }

    async fn handle_op(&mut self, op: Op) {
        match op {
            Op::Start => {
                if self.session.phase() != Phase::Idle {
                    return;
                }
                info!(params = ?self.session.params(), "loading started");
                self.session.start();
                self.emit_progress().await;
                self.run_current();
            }
            Op::UpdateSnapshot(snapshot) => {
                if !self.session.set_snapshot(snapshot) {
                    return;
                }
                if let Some((workspace_id, line)) = self.session.record_target_status() {
                    self.emit(Event::LogAppended { workspace_id, line }).await;
                }
                self.run_current();
            }
            Op::AppendLog {
                workspace_id,
                message,
            } => {
                if self.session.append_log(&workspace_id, &message) {
                    self.emit(Event::LogAppended {
                        workspace_id,
                        line: message,
                    })
                    .await;
                }
            }
            Op::Restart { tab } => self.restart(tab).await,
            Op::Action(action) => self.handle_action(action).await,
            Op::ChangeTab(tab) => {
                self.session.set_tab(tab);
                self.emit_progress().await;
            }
            Op::Shutdown => {}
        }
    }

    async fn handle_signal(&mut self, signal: Signal) {
        match signal {
            Signal::Outcome {
                generation,
                outcome,
            } => {
                if generation != self.generation || !self.session.is_active() {
                    debug!(generation, current = self.generation, "discarding stale outcome");
                    return;
                }
                self.in_flight = None;
                self.apply(outcome).await;
            }
            Signal::Timeout(tick) => {
                let Some(key) = self.timer.fire(tick) else {
                    return;
                };
                if key.step_index != self.session.index() || !self.session.is_active() {
                    return;
                }
                if let Some(error) = self.timeout_error.take() {
                    self.fail(error).await;
                }
            }
            Signal::Recheck { generation } => {
                if generation == self.generation && self.in_flight.is_none() {
                    self.run_current();
                }
            }
            Signal::Created { epoch, workspace } => {
                if epoch == self.epoch {
                    self.session.facts.target = Some(workspace);
                }
            }
            Signal::DevfileUpdated { epoch, step_index } => {
                if epoch != self.epoch {
                    return;
                }
                self.session.facts.devfile_update_pending = false;
                self.rerun_step(step_index);
            }
            Signal::Resolved {
                epoch,
                step_index,
                reply,
            } => {
                if epoch != self.epoch {
                    return;
                }
                match reply {
                    ResolverReply::Devfile(reply) => {
                        self.session.facts.devfile_reply = Some(reply);
                    }
                    ResolverReply::Resources(reply) => {
                        self.session.facts.resources_reply = Some(reply);
                    }
                }
                self.rerun_step(step_index);
            }
            Signal::CallFailed {
                epoch,
                step_index,
                call,
                error,
            } => {
                if epoch != self.epoch {
                    return;
                }
                match call {
                    CollaboratorCall::Create { .. } => {
                        self.session.facts.create_failed = true;
                        self.session.facts.create_requested = false;
                    }
                    CollaboratorCall::UpdateDevfile { .. } => {
                        self.session.facts.devfile_update_pending = false;
                    }
                    _ => {}
                }
                if step_index == self.session.index() && self.session.is_active() {
                    self.fail(error).await;
                }
            }
        }
    }

    async fn handle_action(&mut self, action: AlertActionKind) {
        debug!(?action, "alert action");
        match action {
            AlertActionKind::Restart => self.restart(None).await,
            AlertActionKind::RestartVerbose => self.restart(Some(LoaderTab::Logs)).await,
            AlertActionKind::RestartWithDefaultDevfile => {
                info!("restarting with the default devfile");
                self.reset(None);
                self.session.facts.update_with_default_devfile = true;
                self.emit_progress().await;
                self.run_current();
            }
            AlertActionKind::ContinueWithDefaultDevfile => {
                let facts = &mut self.session.facts;
                facts.use_default_devfile = true;
                drop_attempt(facts);
                self.rerun().await;
            }
            AlertActionKind::Reload => {
                // the resolution stays; failed answers and the attempt to create are dropped
                drop_attempt(&mut self.session.facts);
                self.rerun().await;
            }
            AlertActionKind::CreateNewWorkspace => {
                self.session.facts.create_new_confirmed = true;
                self.rerun().await;
            }
            AlertActionKind::StopRunningWorkspace(workspace) => {
                self.session.facts.redundant_workspace = Some(workspace);
                self.session.facts.stop_requested = false;
                self.rerun().await;
            }
            AlertActionKind::OpenExistingWorkspace(workspace)
            | AlertActionKind::SwitchToWorkspace(workspace) => {
                self.leave(Event::SwitchToWorkspace(workspace)).await;
            }
            AlertActionKind::ReturnToDashboard => self.leave(Event::ReturnToDashboard).await,
        }
    }

    /// Runs `step_index` again if it is still the current step.
    fn rerun_step(&mut self, step_index: usize) {
        if step_index == self.session.index() && self.session.is_active() {
            self.run_current();
        }
    }

    /// Spawns the runner of the current step, superseding any invocation
    /// still in flight.
    fn run_current(&mut self) {
        if !self.session.is_active() {
            return;
        }

        self.abort_invocation();
        self.generation += 1;

        let Some(ctx) = self.session.context(
            &self.options.config,
            self.options.default_devfile.as_ref(),
            &self.collaborators,
        ) else {
            return;
        };

        let generation = self.generation;
        let tx = self.signal_tx.clone();
        self.in_flight = Some(tokio::spawn(async move {
            let outcome = run_step(ctx).await;
            let _ = tx.send(Signal::Outcome {
                generation,
                outcome,
            });
        }));
    }

    async fn apply(&mut self, outcome: StepOutcome) {
        let reloads = self.collaborators.reloads.clone();
        self.session.apply_effects(outcome.effects, reloads.as_ref());

        match outcome.result {
            Err(error) => self.fail(error).await,
            Ok(StepVerdict::Advance) => self.advance().await,
            Ok(StepVerdict::Wait(wait)) => {
                self.arm(wait);
                self.emit_progress().await;
            }
            Ok(StepVerdict::Request { call, then }) => {
                self.perform(call);
                self.arm(then);
                self.emit_progress().await;
            }
            Ok(StepVerdict::Navigate(url)) => {
                info!(%url, "workspace is ready");
                self.cancel_waits();
                self.session.finish();
                self.emit_progress().await;
                self.emit(Event::Navigate { url }).await;
            }
            Ok(StepVerdict::Redirect {
                authentication_url,
                redirect_url,
            }) => {
                info!(%authentication_url, "redirecting to authenticate");
                self.cancel_waits();
                self.session.suspend();
                self.emit_progress().await;
                self.emit(Event::OAuthRedirect {
                    authentication_url,
                    redirect_url,
                })
                .await;
            }
        }
    }

    async fn advance(&mut self) {
        self.cancel_waits();

        if !self.session.advance() {
            // the last step navigates; running past it means nothing is left
            self.session.finish();
            self.emit_progress().await;
            return;
        }

        info!(
            index = self.session.index(),
            step = ?self.session.current_step().map(|s| s.id),
            "step advanced"
        );
        self.emit_progress().await;
        self.run_current();
    }

    fn arm(&mut self, wait: WaitSpec) {
        match wait.budget {
            Some(budget) => {
                let key = WaitKey {
                    step_index: self.session.index(),
                    name: wait.name.to_string(),
                };
                if self.timer.arm(key, budget) == Armed::New {
                    debug!(wait = wait.name, ?budget, "wait armed");
                }
                self.timeout_error = wait.on_timeout;
            }
            None => {
                self.timer.cancel();
                self.timeout_error = None;
            }
        }

        if let Some(delay) = wait.recheck_after {
            if let Some(recheck) = self.recheck.take() {
                recheck.abort();
            }
            let generation = self.generation;
            self.recheck = Some(schedule(
                &self.signal_tx,
                delay,
                Signal::Recheck { generation },
            ));
        }
    }

    /// Records the intent of `call` and performs it in the background.
    fn perform(&mut self, call: CollaboratorCall) {
        match &call {
            CollaboratorCall::Start(workspace) => {
                self.session.facts.start_requested = true;
                self.session.clear_logs(workspace);
            }
            CollaboratorCall::Stop(workspace) => {
                self.session.facts.stop_requested = true;
                self.session.clear_logs(workspace);
            }
            CollaboratorCall::Create { namespace, draft } => {
                let facts = &mut self.session.facts;
                facts.create_requested = true;
                facts.draft = Some(draft.clone());
                facts.target = Some(WorkspaceParams::new(namespace, &draft.name));
            }
            CollaboratorCall::UpdateDevfile { .. } => {
                let facts = &mut self.session.facts;
                facts.update_with_default_devfile = false;
                facts.devfile_update_pending = true;
            }
            CollaboratorCall::ResolveDevfile(_) | CollaboratorCall::FetchResources(_) => {
                self.session.facts.resolve_requested = true;
            }
        }

        debug!(?call, "performing call");
        let epoch = self.epoch;
        let step_index = self.session.index();
        let client = self.collaborators.client.clone();
        let resolver = self.collaborators.resolver.clone();
        let tx = self.signal_tx.clone();

        self.calls.retain(|call| !call.is_finished());
        self.calls.push(tokio::spawn(async move {
            let result = match &call {
                CollaboratorCall::Start(workspace) => client.start_workspace(workspace).await,
                CollaboratorCall::Stop(workspace) => client.stop_workspace(workspace).await,
                CollaboratorCall::Create { namespace, draft } => client
                    .create_workspace(namespace, draft)
                    .await
                    .map(|workspace| {
                        let _ = tx.send(Signal::Created { epoch, workspace });
                    }),
                CollaboratorCall::UpdateDevfile { workspace, devfile } => client
                    .update_workspace_devfile(workspace, devfile)
                    .await
                    .map(|()| {
                        let _ = tx.send(Signal::DevfileUpdated { epoch, step_index });
                    }),
                CollaboratorCall::ResolveDevfile(params) => {
                    let reply = resolver.resolve_devfile(&params.source_url, params).await;
                    let _ = tx.send(Signal::Resolved {
                        epoch,
                        step_index,
                        reply: ResolverReply::Devfile(reply),
                    });
                    Ok(())
                }
                CollaboratorCall::FetchResources(url) => {
                    let reply = resolver.fetch_resources(url).await;
                    let _ = tx.send(Signal::Resolved {
                        epoch,
                        step_index,
                        reply: ResolverReply::Resources(reply),
                    });
                    Ok(())
                }
            };

            if let Err(err) = result {
                let error = match &call {
                    CollaboratorCall::Create { draft, .. }
                        if matches!(draft.request, CreateRequest::Devfile(_)) =>
                    {
                        LoaderError::CreateWorkspace(err.to_string())
                    }
                    _ => LoaderError::from(err),
                };
                let _ = tx.send(Signal::CallFailed {
                    epoch,
                    step_index,
                    call,
                    error,
                });
            }
        }));
    }

    async fn fail(&mut self, error: LoaderError) {
        warn!(
            step = ?self.session.current_step().map(|s| s.id),
            kind = ?error.kind(),
            %error,
            "step failed"
        );
        self.cancel_waits();
        self.abort_invocation();
        self.session.fail(error);
        self.emit_progress().await;
    }

    /// Clears the current failure and runs the current step again.
    async fn rerun(&mut self) {
        self.session.clear_error();
        self.emit_progress().await;
        self.run_current();
    }

    async fn restart(&mut self, tab: Option<LoaderTab>) {
        info!("restarting");
        self.reset(tab);
        self.emit_progress().await;
        self.run_current();
    }

    /// Drops all progress and every pending call.
    fn reset(&mut self, tab: Option<LoaderTab>) {
        self.cancel_all();
        self.epoch += 1;
        self.generation += 1;
        self.session.restart(tab);
    }

    async fn leave(&mut self, event: Event) {
        self.cancel_all();
        self.session.finish();
        self.emit(event).await;
    }

    fn abort_invocation(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }

    fn cancel_waits(&mut self) {
        self.timer.cancel();
        self.timeout_error = None;
        if let Some(recheck) = self.recheck.take() {
            recheck.abort();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel_waits();
        self.abort_invocation();
        for call in self.calls.drain(..) {
            call.abort();
        }
    }

    async fn emit_progress(&self) {
        self.emit(Event::Progress(self.session.view())).await;
    }

    async fn emit(&self, event: Event) {
        // the view layer may already be gone
        let _ = self.events_tx.send(event).await;
    }
}

/// Forgets the failed parts of the current attempt so the step can run again.
fn drop_attempt(facts: &mut SessionFacts) {
    facts.draft = None;
    facts.create_requested = false;
    facts.create_failed = false;
    facts.resolve_requested = false;
    facts.devfile_reply = None;
    facts.resources_reply = None;
}

/// Handle of a spawned controller.
pub struct LoaderHandle {
    pub ops: mpsc::Sender<Op>,
    pub events: mpsc::Receiver<Event>,
    pub task: JoinHandle<()>,
}

/// Spawns a controller for `params` on the current runtime.
pub fn spawn_loader(
    params: MatchParams,
    options: LoaderOptions,
    collaborators: Collaborators,
) -> LoaderHandle {
    let (ops_tx, ops_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (events_tx, events_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let controller = LoaderController::new(params, options, collaborators, events_tx);
    let task = tokio::spawn(controller.run(ops_rx));

    LoaderHandle {
        ops: ops_tx,
        events: events_rx,
        task,
    }
}
