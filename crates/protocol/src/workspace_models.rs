//! Workspace snapshot models.
//!
//! A `WorkspaceSnapshot` is the observed state of one workspace on the
//! cluster. Snapshots are produced by the cluster client and never mutated by
//! the loader; the loader only reads them to decide what to do next.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use ts_rs::TS;

use crate::config_models::ServerSettings;
use crate::factory_models::{Devfile, FactoryResolution, PrebuiltResources};

/// Lifecycle phase of a workspace as reported by the cluster.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
pub enum WorkspaceStatus {
    Starting,
    Running,
    Failed,
    Failing,
    Stopped,
    Stopping,
    Terminating,
}

impl WorkspaceStatus {
    /// Returns true for the phases that can not lead to `Running` without
    /// another start request.
    pub fn is_stopped_or_stopping(self) -> bool {
        matches!(
            self,
            Self::Stopping | Self::Failing | Self::Stopped | Self::Failed | Self::Terminating
        )
    }
}

impl fmt::Display for WorkspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "Starting",
            Self::Running => "Running",
            Self::Failed => "Failed",
            Self::Failing => "Failing",
            Self::Stopped => "Stopped",
            Self::Stopping => "Stopping",
            Self::Terminating => "Terminating",
        };
        f.write_str(name)
    }
}

/// Namespace and name of a workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceParams {
    pub namespace: String,
    pub workspace_name: String,
}

impl WorkspaceParams {
    pub fn new(namespace: impl Into<String>, workspace_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            workspace_name: workspace_name.into(),
        }
    }
}

impl fmt::Display for WorkspaceParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.workspace_name)
    }
}

/// The observed state of a single workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSnapshot {
    pub namespace: String,
    pub name: String,

    /// Opaque runtime id assigned by the cluster once provisioning begins.
    #[serde(default)]
    pub uid: Option<String>,

    pub status: WorkspaceStatus,

    /// Status message reported alongside the phase.
    #[serde(default)]
    pub message: Option<String>,

    /// Externally reachable IDE URL, present only once the IDE is exposed.
    #[serde(default)]
    pub ide_url: Option<String>,

    #[serde(default)]
    pub is_deprecated: bool,

    /// Value of the factory source annotation, if the workspace was created
    /// from a factory URL.
    #[serde(default)]
    pub source: Option<String>,

    /// A warning raised by the cluster while admitting the workspace.
    #[serde(default)]
    pub warning: Option<String>,
}

impl WorkspaceSnapshot {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        status: WorkspaceStatus,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            uid: None,
            status,
            message: None,
            ide_url: None,
            is_deprecated: false,
            source: None,
            warning: None,
        }
    }

    /// Key used by the log aggregator: the runtime id when assigned,
    /// otherwise `namespace/name`.
    pub fn log_key(&self) -> String {
        match &self.uid {
            Some(uid) => uid.clone(),
            None => format!("{}/{}", self.namespace, self.name),
        }
    }

    pub fn params(&self) -> WorkspaceParams {
        WorkspaceParams::new(&self.namespace, &self.name)
    }

    pub fn matches(&self, params: &WorkspaceParams) -> bool {
        self.namespace == params.namespace && self.name == params.workspace_name
    }
}

/// Everything the external store knows at one point in time.
///
/// The loader receives a fresh `ClusterSnapshot` on every store change and
/// treats it as read-only.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub workspaces: Vec<WorkspaceSnapshot>,

    /// Provisioned infrastructure namespaces of the user.
    #[serde(default)]
    pub namespaces: Vec<String>,

    /// Devfile resolutions already present in the store, keyed by location.
    #[serde(default)]
    pub resolutions: HashMap<String, FactoryResolution>,

    /// Pre-built resources already present in the store, keyed by URL.
    #[serde(default)]
    pub prebuilt_resources: HashMap<String, PrebuiltResources>,

    /// Default devfile provided by the cluster.
    #[serde(default)]
    pub default_devfile: Option<Devfile>,

    #[serde(default)]
    pub server_settings: ServerSettings,
}

impl ClusterSnapshot {
    pub fn find(&self, params: &WorkspaceParams) -> Option<&WorkspaceSnapshot> {
        self.workspaces.iter().find(|w| w.matches(params))
    }

    pub fn running(&self) -> impl Iterator<Item = &WorkspaceSnapshot> {
        self.workspaces
            .iter()
            .filter(|w| matches!(w.status, WorkspaceStatus::Starting | WorkspaceStatus::Running))
    }
}
