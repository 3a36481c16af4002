//! Configuration models for `.ws-loader/config.toml` and cluster settings.
//!
//! Every timeout the loader uses can come from three places. A value in the
//! local config file wins over the value provided by the cluster, which wins
//! over the built-in fallback.

use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents local settings from `.ws-loader/config.toml`.
///
/// All fields are optional; unset fields fall through to the cluster
/// settings and then to the built-in fallbacks.
///
/// # Example
///
/// ```toml
/// # .ws-loader/config.toml
/// start_timeout_sec = 600
/// verify_ide_endpoint = true
/// dashboard_origin = "https://devspaces.example.com"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// How long a workspace may stay in `Stopping`/`Failing`.
    #[serde(default)]
    pub stop_timeout_sec: Option<u64>,

    /// How long a workspace may stay in `Starting`.
    #[serde(default)]
    pub start_timeout_sec: Option<u64>,

    /// How long a running workspace may go without an IDE URL.
    #[serde(default)]
    pub url_timeout_sec: Option<u64>,

    /// Budget for devfile resolution and resources fetching.
    #[serde(default)]
    pub resolve_timeout_sec: Option<u64>,

    /// Budget for a created workspace to show up in the store.
    #[serde(default)]
    pub create_timeout_sec: Option<u64>,

    /// Minimum time a step is displayed before advancing.
    #[serde(default)]
    pub min_step_duration_ms: Option<u64>,

    /// Number of OAuth redirects allowed per factory URL.
    #[serde(default)]
    pub reloads_limit: Option<u32>,

    /// Probe the IDE URL before navigating to it.
    #[serde(default)]
    pub verify_ide_endpoint: Option<bool>,

    /// Delay between two probes of an unreachable IDE URL.
    #[serde(default)]
    pub endpoint_recheck_ms: Option<u64>,

    /// Maximum number of running workspaces per user.
    #[serde(default)]
    pub running_workspaces_limit: Option<u32>,

    /// Origin used to build OAuth redirect URLs.
    #[serde(default)]
    pub dashboard_origin: Option<String>,
}

/// Settings provided by the cluster.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default)]
    pub start_timeout_sec: Option<u64>,

    #[serde(default)]
    pub running_workspaces_limit: Option<u32>,

    #[serde(default)]
    pub dashboard_origin: Option<String>,
}
