//! Alert models.
//!
//! The loader exposes at most one alert at a time: the latest failure or
//! warning of the current step together with the actions the user can take.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::workspace_models::WorkspaceParams;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub enum AlertVariant {
    Danger,
    Warning,
}

/// What happens when the user picks an alert action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum AlertActionKind {
    Restart,
    /// Restart and switch to the logs tab.
    RestartVerbose,
    /// Restart after replacing the devfile of the workspace with the default
    /// one.
    RestartWithDefaultDevfile,
    ContinueWithDefaultDevfile,
    /// Clear the error and run the current step again.
    Reload,
    OpenExistingWorkspace(WorkspaceParams),
    CreateNewWorkspace,
    StopRunningWorkspace(WorkspaceParams),
    SwitchToWorkspace(WorkspaceParams),
    ReturnToDashboard,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct AlertAction {
    pub title: String,
    pub kind: AlertActionKind,
}

impl AlertAction {
    pub fn new(title: impl Into<String>, kind: AlertActionKind) -> Self {
        Self {
            title: title.into(),
            kind,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct AlertItem {
    /// Stable key of the alert source, e.g. `ide-loader-start-workspace`.
    pub key: String,
    pub title: String,
    pub variant: AlertVariant,
    pub body: String,
    pub actions: Vec<AlertAction>,
}
