//! External collaborator seams.
//!
//! The loader never talks to the cluster or the devfile resolver directly;
//! it goes through these traits. Production code plugs real clients in,
//! tests and the replay CLI use [`mock::MockCluster`].

pub mod mock;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, ResolverError};
use wl_protocol::factory_models::{
    Devfile, FactoryParams, FactoryResolution, PrebuiltResources, WorkspaceDraft,
};
use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceSnapshot};

/// Operations on workspace resources.
#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// Looks a workspace up directly, bypassing the store.
    async fn resolve_workspace(
        &self,
        params: &WorkspaceParams,
    ) -> Result<Option<WorkspaceSnapshot>, ClientError>;

    async fn create_workspace(
        &self,
        namespace: &str,
        draft: &WorkspaceDraft,
    ) -> Result<WorkspaceParams, ClientError>;

    async fn start_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError>;

    async fn stop_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError>;

    /// Replaces the devfile of `workspace`, keeping its name and namespace.
    async fn update_workspace_devfile(
        &self,
        workspace: &WorkspaceParams,
        devfile: &Devfile,
    ) -> Result<(), ClientError>;

    async fn delete_workspace(&self, workspace: &WorkspaceParams) -> Result<(), ClientError>;
}

/// Resolution of factory URLs.
#[async_trait]
pub trait FactoryResolver: Send + Sync {
    async fn resolve_devfile(
        &self,
        url: &str,
        params: &FactoryParams,
    ) -> Result<FactoryResolution, ResolverError>;

    async fn fetch_resources(&self, url: &str) -> Result<PrebuiltResources, ResolverError>;
}

/// Liveness probe of IDE endpoints.
#[async_trait]
pub trait EndpointProbe: Send + Sync {
    async fn is_reachable(&self, url: &str) -> bool;
}

/// Counts OAuth redirects per factory URL.
///
/// The count has to survive a page reload, so it lives outside of the loader
/// session.
pub trait ReloadTracker: Send + Sync {
    fn count(&self, url: &str) -> u32;
    fn increment(&self, url: &str);
    fn clear(&self);
}

/// In-memory `ReloadTracker`.
#[derive(Debug, Default)]
pub struct SessionReloads {
    reloads: Mutex<HashMap<String, u32>>,
}

impl SessionReloads {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReloadTracker for SessionReloads {
    fn count(&self, url: &str) -> u32 {
        self.reloads
            .lock()
            .map(|reloads| reloads.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn increment(&self, url: &str) {
        if let Ok(mut reloads) = self.reloads.lock() {
            *reloads.entry(url.to_string()).or_insert(0) += 1;
        }
    }

    fn clear(&self) {
        if let Ok(mut reloads) = self.reloads.lock() {
            reloads.clear();
        }
    }
}

/// Everything the loader needs from the outside world.
#[derive(Clone)]
pub struct Collaborators {
    pub client: Arc<dyn WorkspaceClient>,
    pub resolver: Arc<dyn FactoryResolver>,
    pub probe: Arc<dyn EndpointProbe>,
    pub reloads: Arc<dyn ReloadTracker>,
}

impl Collaborators {
    pub fn new(
        client: Arc<dyn WorkspaceClient>,
        resolver: Arc<dyn FactoryResolver>,
        probe: Arc<dyn EndpointProbe>,
    ) -> Self {
        Self {
            client,
            resolver,
            probe,
            reloads: Arc::new(SessionReloads::new()),
        }
    }

    pub fn with_reload_tracker(mut self, reloads: Arc<dyn ReloadTracker>) -> Self {
        self.reloads = reloads;
        self
    }

    /// All three seams served by one object, e.g. a mock cluster.
    pub fn from_shared<T>(shared: Arc<T>) -> Self
    where
        T: WorkspaceClient + FactoryResolver + EndpointProbe + 'static,
    {
        Self::new(shared.clone(), shared.clone(), shared)
    }
}
