//! Replay scenario models for `.ws-loader/scenarios/*.yaml`.
//!
//! A scenario scripts a loading attempt: the target, the timeline of store
//! updates and user actions, and the answers of the mocked collaborators.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::alert_models::AlertActionKind;
use crate::factory_models::{FactoryResolution, PrebuiltResources};
use crate::ipc::MatchParams;
use crate::step_models::LoaderTab;
use crate::workspace_models::ClusterSnapshot;

/// A complete replay scenario.
///
/// # Example
///
/// ```yaml
/// name: open-stopped-workspace
/// target:
///   type: workspace
///   params:
///     namespace: user-che
///     workspaceName: wksp
/// timeline:
///   - after-ms: 0
///     event:
///       snapshot:
///         workspaces:
///           - { namespace: user-che, name: wksp, status: Stopped }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct Scenario {
    pub name: String,

    pub target: MatchParams,

    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,

    #[serde(default)]
    pub replies: MockReplies,

    /// How long to keep the controller running after the last entry.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    1_000
}

/// One scripted input, delivered `after_ms` after the previous one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct TimelineEntry {
    #[serde(default)]
    pub after_ms: u64,

    pub event: ScenarioEvent,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioEvent {
    Snapshot(ClusterSnapshot),
    Log {
        #[serde(rename = "workspace-id")]
        workspace_id: String,
        message: String,
    },
    Action(AlertActionKind),
    Restart { tab: Option<LoaderTab> },
}

/// Reply of a mocked devfile resolution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub enum ResolveReply {
    Resolved(FactoryResolution),
    Error(String),
    /// The repository is private; authentication is required.
    Oauth {
        #[serde(rename = "authentication-url")]
        authentication_url: String,
    },
}

/// Reply of a mocked pre-built resources fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub enum ResourcesReply {
    Fetched(PrebuiltResources),
    Error(String),
}

/// Reply of a mocked mutating cluster call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "kebab-case")]
pub enum CallReply {
    Ok,
    Error(String),
}

/// Scripted answers of the mocked collaborators, consumed in order.
///
/// Once a queue runs dry, the last reply is repeated; an empty queue means
/// success.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(rename_all = "kebab-case")]
pub struct MockReplies {
    #[serde(default)]
    pub resolve_devfile: Vec<ResolveReply>,
    #[serde(default)]
    pub fetch_resources: Vec<ResourcesReply>,
    #[serde(default)]
    pub create_workspace: Vec<CallReply>,
    #[serde(default)]
    pub start_workspace: Vec<CallReply>,
    #[serde(default)]
    pub stop_workspace: Vec<CallReply>,
    #[serde(default)]
    pub update_workspace: Vec<CallReply>,
    /// Answers of the IDE endpoint probe.
    #[serde(default)]
    pub endpoint_reachable: Vec<bool>,
}
