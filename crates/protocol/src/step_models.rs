//! Loader step models.
//!
//! This module defines the identifiers of the loading stages, the mutable-by-
//! snapshot `LoaderStep` record and the nested structure the view layer uses
//! to render the progress wizard.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Identifies one stage of a loading flow.
///
/// Stages prefixed with `CreateWorkspace` (other than `CreateWorkspace`
/// itself) are nested under the `CreateWorkspace` group step.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoadingStep {
    Initialize,
    CheckRunningWorkspacesLimit,
    CreateWorkspace,
    CreateWorkspaceFetchDevfile,
    CreateWorkspaceFetchResources,
    CreateWorkspaceCheckExistingWorkspaces,
    CreateWorkspaceApplyDevfile,
    CreateWorkspaceApplyResources,
    StartWorkspace,
    OpenWorkspace,
}

impl LoadingStep {
    /// The title shown for the step before any runner rewrites it.
    pub fn default_title(self) -> &'static str {
        match self {
            Self::Initialize => "Initializing",
            Self::CheckRunningWorkspacesLimit => "Checking for the limit of running workspaces",
            Self::CreateWorkspace => "Creating a workspace",
            Self::CreateWorkspaceFetchDevfile => "Looking for devfile",
            Self::CreateWorkspaceFetchResources => "Fetching pre-built resources",
            Self::CreateWorkspaceCheckExistingWorkspaces => {
                "Checking if a workspace with the same name exists"
            }
            Self::CreateWorkspaceApplyDevfile => "Applying devfile",
            Self::CreateWorkspaceApplyResources => "Applying resources",
            Self::StartWorkspace => "Waiting for workspace to start",
            Self::OpenWorkspace => "Open IDE",
        }
    }

    /// The grouping step this step is displayed under, if any.
    pub fn parent(self) -> Option<LoadingStep> {
        match self {
            Self::CreateWorkspaceFetchDevfile
            | Self::CreateWorkspaceFetchResources
            | Self::CreateWorkspaceCheckExistingWorkspaces
            | Self::CreateWorkspaceApplyDevfile
            | Self::CreateWorkspaceApplyResources => Some(Self::CreateWorkspace),
            _ => None,
        }
    }
}

impl fmt::Display for LoadingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_title())
    }
}

/// Where the workspace definition of a factory flow comes from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "kebab-case")]
pub enum FactorySource {
    /// A devfile resolved from a repository or raw URL.
    Devfile,
    /// Pre-built DevWorkspace resources fetched from a URL.
    PrebuiltResources,
}

/// The kind of loading flow a step list is built for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, TS)]
#[serde(tag = "kind", content = "source", rename_all = "kebab-case")]
pub enum FlowKind {
    /// Open a workspace that already exists on the cluster.
    OpenExisting,
    /// Create a workspace from a URL, then open it.
    ImportFromUrl(FactorySource),
}

/// One stage of the loading wizard as shown to the user.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStep {
    pub id: LoadingStep,

    /// Human label; runners may rewrite it while the step is active.
    pub title: String,

    /// The grouping step, when nested.
    pub parent_id: Option<LoadingStep>,

    pub has_error: bool,
    pub has_warning: bool,
}

impl LoaderStep {
    pub fn new(id: LoadingStep) -> Self {
        Self {
            id,
            title: id.default_title().to_string(),
            parent_id: id.parent(),
            has_error: false,
            has_warning: false,
        }
    }
}

/// Rendering status of a step relative to the current step index.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub enum StepDisplayStatus {
    Done,
    InProgress,
    Failed,
    Warning,
    Pending,
}

/// A node of the nested progress tree.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct StepNode {
    pub id: LoadingStep,
    pub title: String,
    pub status: StepDisplayStatus,
    pub children: Vec<StepNode>,
}

/// Tabs of the loader page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
pub enum LoaderTab {
    #[default]
    Progress,
    Logs,
}
