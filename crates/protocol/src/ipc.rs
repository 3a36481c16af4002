//! Loader communication protocol.
//!
//! This module defines the message types exchanged between the view layer
//! and the loader controller.
//!
//! The protocol follows an Operation/Event pattern:
//! - `Op`: Commands and store updates sent to the controller
//! - `Event`: Progress updates and terminal actions sent by the controller
//!
//! Communication is asynchronous and channel-based. The controller processes
//! operations strictly in arrival order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::alert_models::{AlertActionKind, AlertItem};
use crate::factory_models::FactoryParams;
use crate::step_models::{FlowKind, LoaderStep, LoaderTab, StepNode};
use crate::workspace_models::{ClusterSnapshot, WorkspaceParams};

/// Identifies the resource a loading attempt is about.
///
/// Immutable for the life of one loading attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "params", rename_all = "camelCase")]
pub enum MatchParams {
    /// Open an existing workspace.
    Workspace(WorkspaceParams),
    /// Create a workspace from a factory URL.
    Factory(FactoryParams),
}

impl MatchParams {
    pub fn flow_kind(&self) -> FlowKind {
        match self {
            Self::Workspace(_) => FlowKind::OpenExisting,
            Self::Factory(params) => FlowKind::ImportFromUrl(params.source()),
        }
    }
}

/// Operations sent to the loader controller.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "restart",
///   "payload": { "tab": "Logs" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Op {
    /// Build the step list and run the first step.
    Start,

    /// The external store changed.
    ///
    /// The controller re-runs the active step against the new snapshot.
    /// Sending an unchanged snapshot is a no-op.
    UpdateSnapshot(ClusterSnapshot),

    /// A log line was streamed for a workspace.
    AppendLog {
        /// Runtime id of the workspace, or `namespace/name`.
        workspace_id: String,
        message: String,
    },

    /// Drop all progress and start over.
    Restart {
        /// Tab to show after restarting.
        tab: Option<LoaderTab>,
    },

    /// The user picked an action of the current alert.
    Action(AlertActionKind),

    /// Switch between the progress and logs tabs.
    ChangeTab(LoaderTab),

    /// Cancel everything and stop the controller.
    Shutdown,
}

/// Everything the view layer needs to render the loader page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct LoaderView {
    #[ts(type = "string")]
    pub session_id: Uuid,

    pub started_at: DateTime<Utc>,

    pub current_step_index: usize,

    pub steps: Vec<LoaderStep>,

    /// Nested rendering of `steps` relative to `current_step_index`.
    pub tree: Vec<StepNode>,

    pub alert: Option<AlertItem>,

    pub tab: LoaderTab,
}

/// Events sent by the loader controller.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "navigate",
///   "payload": { "url": "https://ide" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// The step list, current index, alert or tab changed.
    Progress(LoaderView),

    /// The IDE is ready; the page should navigate to it.
    Navigate { url: String },

    /// Devfile resolution needs authentication with a git provider.
    ///
    /// The page should open `authentication_url`, which returns to
    /// `redirect_url` once the user has authenticated.
    OAuthRedirect {
        authentication_url: String,
        redirect_url: String,
    },

    /// The user chose to continue with another workspace.
    SwitchToWorkspace(WorkspaceParams),

    /// The user chose to leave the loader.
    ReturnToDashboard,

    /// A new log line was recorded for the target workspace.
    LogAppended { workspace_id: String, line: String },
}
