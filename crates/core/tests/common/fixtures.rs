//! Test fixtures for creating snapshots, parameters and controllers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use wl_core::collaborators::mock::MockCluster;
use wl_core::collaborators::Collaborators;
use wl_core::loader::{spawn_loader, LoaderOptions};
use wl_protocol::factory_models::FactoryParams;
use wl_protocol::ipc::{Event, LoaderView, MatchParams, Op};
use wl_protocol::scenario_models::MockReplies;
use wl_protocol::workspace_models::{
    ClusterSnapshot, WorkspaceParams, WorkspaceSnapshot, WorkspaceStatus,
};

pub const NAMESPACE: &str = "user-che";
pub const WORKSPACE: &str = "wksp";
pub const REPO_URL: &str = "https://github.com/eclipse-che/che-dashboard";

pub fn target() -> WorkspaceParams {
    WorkspaceParams::new(NAMESPACE, WORKSPACE)
}

pub fn workspace(name: &str, status: WorkspaceStatus) -> WorkspaceSnapshot {
    WorkspaceSnapshot::new(NAMESPACE, name, status)
}

pub fn with_url(mut workspace: WorkspaceSnapshot, url: &str) -> WorkspaceSnapshot {
    workspace.ide_url = Some(url.to_string());
    workspace
}

pub fn with_message(mut workspace: WorkspaceSnapshot, message: &str) -> WorkspaceSnapshot {
    workspace.message = Some(message.to_string());
    workspace
}

/// A snapshot of the target namespace holding `workspaces`.
pub fn snapshot(workspaces: Vec<WorkspaceSnapshot>) -> ClusterSnapshot {
    ClusterSnapshot {
        workspaces,
        namespaces: vec![NAMESPACE.to_string()],
        ..ClusterSnapshot::default()
    }
}

pub fn factory_params() -> FactoryParams {
    FactoryParams {
        source_url: REPO_URL.to_string(),
        ..FactoryParams::default()
    }
}

/// Create a temporary project directory with a `.ws-loader` configuration.
///
/// Returns a TempDir that must be kept alive for the test duration.
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();

    std::fs::create_dir_all(root.join(".ws-loader/scenarios"))?;
    std::fs::write(
        root.join(".ws-loader/config.toml"),
        "stop_timeout_sec = 30\nstart_timeout_sec = 120\n",
    )?;
    std::fs::write(
        root.join(".ws-loader/default-devfile.yaml"),
        "schemaVersion: 2.2.0\nmetadata:\n  name: empty\n",
    )?;
    std::fs::write(
        root.join(".ws-loader/scenarios/open.yaml"),
        r#"
name: open-running
target:
  type: workspace
  params:
    namespace: user-che
    workspaceName: wksp
timeline:
  - after-ms: 0
    event:
      snapshot:
        workspaces:
          - namespace: user-che
            name: wksp
            status: Running
            ideUrl: https://ide
"#,
    )?;

    Ok(temp_dir)
}

/// Drives a spawned controller and records everything it emits.
pub struct Harness {
    pub ops: mpsc::Sender<Op>,
    pub events: mpsc::Receiver<Event>,
    pub mock: Arc<MockCluster>,
    pub seen: Vec<Event>,
}

impl Harness {
    pub fn new(params: MatchParams, replies: MockReplies, options: LoaderOptions) -> Self {
        Self::with_mock(params, MockCluster::new(replies), options)
    }

    /// Drives a controller backed by an already configured mock.
    pub fn with_mock(params: MatchParams, mock: MockCluster, options: LoaderOptions) -> Self {
        let mock = Arc::new(mock);
        let handle = spawn_loader(params, options, Collaborators::from_shared(mock.clone()));
        Self {
            ops: handle.ops,
            events: handle.events,
            mock,
            seen: Vec::new(),
        }
    }

    pub fn open() -> Self {
        Self::new(
            MatchParams::Workspace(target()),
            MockReplies::default(),
            LoaderOptions::default(),
        )
    }

    pub fn factory(replies: MockReplies) -> Self {
        Self::new(
            MatchParams::Factory(factory_params()),
            replies,
            LoaderOptions::default(),
        )
    }

    pub async fn send(&self, op: Op) {
        self.ops.send(op).await.expect("controller is running");
    }

    /// Starts loading with `snapshot` as the first store state.
    pub async fn start_with(&mut self, snapshot: ClusterSnapshot) {
        self.send(Op::Start).await;
        self.send(Op::UpdateSnapshot(snapshot)).await;
        self.settle(Duration::from_secs(2)).await;
    }

    pub async fn update(&mut self, snapshot: ClusterSnapshot) {
        self.send(Op::UpdateSnapshot(snapshot)).await;
        self.settle(Duration::from_secs(2)).await;
    }

    /// Lets virtual time pass and collects the emitted events.
    pub async fn settle(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
        while let Ok(event) = self.events.try_recv() {
            self.seen.push(event);
        }
    }

    pub fn last_view(&self) -> &LoaderView {
        self.seen
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Progress(view) => Some(view),
                _ => None,
            })
            .expect("at least one progress event")
    }

    pub fn views(&self) -> Vec<&LoaderView> {
        self.seen
            .iter()
            .filter_map(|event| match event {
                Event::Progress(view) => Some(view),
                _ => None,
            })
            .collect()
    }
}
