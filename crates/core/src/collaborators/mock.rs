//! Scripted collaborators for tests and scenario replay.

use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::collaborators::{EndpointProbe, FactoryResolver, WorkspaceClient};
use crate::error::{ClientError, ResolverError};
use crate::runners::prepare::project_name_from_url;
use wl_protocol::factory_models::{
    Devfile, DevfileMetadata, FactoryParams, FactoryResolution, PrebuiltResource,
    PrebuiltResources, WorkspaceDraft,
};
use wl_protocol::scenario_models::{CallReply, MockReplies, ResolveReply, ResourcesReply};
use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceSnapshot};

/// A call received by the mock, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ResolveWorkspace(WorkspaceParams),
    CreateWorkspace { namespace: String, name: String },
    StartWorkspace(WorkspaceParams),
    StopWorkspace(WorkspaceParams),
    UpdateDevfile {
        workspace: WorkspaceParams,
        devfile_name: String,
    },
    DeleteWorkspace(WorkspaceParams),
    ResolveDevfile(String),
    FetchResources(String),
    Probe(String),
}

/// Serves every collaborator seam from a `MockReplies` script.
///
/// Each reply queue is consumed in order; the last reply is repeated once
/// the queue runs dry, and an empty queue answers with success.
#[derive(Debug, Default)]
pub struct MockCluster {
    replies: Mutex<MockReplies>,
    workspaces: Mutex<Vec<WorkspaceSnapshot>>,
    calls: Mutex<Vec<MockCall>>,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn next_reply<T: Clone>(queue: &mut Vec<T>) -> Option<T> {
    if queue.len() > 1 {
        Some(queue.remove(0))
    } else {
        queue.first().cloned()
    }
}

fn call_result(reply: Option<CallReply>) -> Result<(), ClientError> {
    match reply {
        Some(CallReply::Error(message)) => Err(ClientError::Request(message)),
        Some(CallReply::Ok) | None => Ok(()),
    }
}

impl MockCluster {
    pub fn new(replies: MockReplies) -> Self {
        Self {
            replies: Mutex::new(replies),
            ..Self::default()
        }
    }

    /// A mock that answers every call with success.
    pub fn healthy() -> Self {
        Self::default()
    }

    /// Delays every resolver answer, e.g. to exceed the resolve timeout.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Workspaces returned by `resolve_workspace`.
    pub fn with_workspaces(self, workspaces: Vec<WorkspaceSnapshot>) -> Self {
        *lock(&self.workspaces) = workspaces;
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl WorkspaceClient for MockCluster {
    async fn resolve_workspace(
        &self,
        params: &WorkspaceParams,
    ) -> Result<Option<WorkspaceSnapshot>, ClientError> {
        self.record(MockCall::ResolveWorkspace(params.clone()));
        Ok(lock(&self.workspaces)
            .iter()
            .find(|w| w.matches(params))
            .cloned())
    }

    async fn create_workspace(
        &self,
        namespace: &str,
        draft: &WorkspaceDraft,
    ) -> Result<WorkspaceParams, ClientError> {
        self.record(MockCall::CreateWorkspace {
            namespace: namespace.to_string(),
            name: draft.name.clone(),
        });
        let reply = next_reply(&mut lock(&self.replies).create_workspace);
        call_result(reply)?;
        Ok(WorkspaceParams::new(namespace, &draft.name))
    }

    async fn start_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError> {
        self.record(MockCall::StartWorkspace(workspace.clone()));
        let reply = next_reply(&mut lock(&self.replies).start_workspace);
        call_result(reply)
    }

    async fn stop_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError> {
        self.record(MockCall::StopWorkspace(workspace.clone()));
        let reply = next_reply(&mut lock(&self.replies).stop_workspace);
        call_result(reply)
    }

    async fn update_workspace_devfile(
        &self,
        workspace: &WorkspaceParams,
        devfile: &Devfile,
    ) -> Result<(), ClientError> {
        self.record(MockCall::UpdateDevfile {
            workspace: workspace.clone(),
            devfile_name: devfile.metadata.name.clone(),
        });
        let reply = next_reply(&mut lock(&self.replies).update_workspace);
        call_result(reply)
    }

    async fn delete_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError> {
        self.record(MockCall::DeleteWorkspace(workspace.clone()));
        Ok(())
    }
}

#[async_trait]
impl FactoryResolver for MockCluster {
    async fn resolve_devfile(
        &self,
        url: &str,
        _params: &FactoryParams,
    ) -> Result<FactoryResolution, ResolverError> {
        self.record(MockCall::ResolveDevfile(url.to_string()));
        let reply = next_reply(&mut lock(&self.replies).resolve_devfile);
        self.simulate_latency().await;

        match reply {
            Some(ResolveReply::Resolved(resolution)) => Ok(resolution),
            Some(ResolveReply::Error(message)) => Err(ResolverError::Failed(message)),
            Some(ResolveReply::Oauth { authentication_url }) => {
                Err(ResolverError::OAuthRequired { authentication_url })
            }
            None => {
                let name = project_name_from_url(url);
                Ok(FactoryResolution {
                    location: url.to_string(),
                    source: Some("devfile.yaml".to_string()),
                    devfile: Devfile {
                        metadata: DevfileMetadata {
                            name,
                            generate_name: None,
                        },
                        ..Devfile::default()
                    },
                    converted: false,
                })
            }
        }
    }

    async fn fetch_resources(&self, url: &str) -> Result<PrebuiltResources, ResolverError> {
        self.record(MockCall::FetchResources(url.to_string()));
        let reply = next_reply(&mut lock(&self.replies).fetch_resources);
        self.simulate_latency().await;

        match reply {
            Some(ResourcesReply::Fetched(resources)) => Ok(resources),
            Some(ResourcesReply::Error(message)) => Err(ResolverError::Failed(message)),
            None => Ok(PrebuiltResources {
                resources: vec![PrebuiltResource {
                    kind: "DevWorkspace".to_string(),
                    name: project_name_from_url(url),
                }],
            }),
        }
    }
}

#[async_trait]
impl EndpointProbe for MockCluster {
    async fn is_reachable(&self, url: &str) -> bool {
        self.record(MockCall::Probe(url.to_string()));
        next_reply(&mut lock(&self.replies).endpoint_reachable).unwrap_or(true)
    }
}
