//! Configuration models that aggregate all settings.
//!
//! `AppConfig` is what the loader reads from disk. `LoaderSettings` is the
//! effective set of timeouts and policies for one runner invocation, after
//! local values, cluster settings and fallbacks have been merged.

use std::time::Duration;

use wl_protocol::config_models::{LoaderConfig, ServerSettings};
use wl_protocol::factory_models::Devfile;
use wl_protocol::scenario_models::Scenario;

pub const DEFAULT_STOP_TIMEOUT_SEC: u64 = 60;
pub const DEFAULT_START_TIMEOUT_SEC: u64 = 300;
pub const DEFAULT_URL_TIMEOUT_SEC: u64 = 20;
pub const DEFAULT_RESOLVE_TIMEOUT_SEC: u64 = 20;
pub const DEFAULT_CREATE_TIMEOUT_SEC: u64 = 20;
pub const DEFAULT_MIN_STEP_DURATION_MS: u64 = 200;
pub const DEFAULT_RELOADS_LIMIT: u32 = 1;
pub const DEFAULT_ENDPOINT_RECHECK_MS: u64 = 1_000;
pub const DEFAULT_RUNNING_WORKSPACES_LIMIT: u32 = 1;
pub const DEFAULT_DASHBOARD_ORIGIN: &str = "http://localhost:8080";

/// Unified application configuration loaded from `.ws-loader/`.
///
/// This structure aggregates all configuration sources:
/// - `config.toml`: Timeouts and policies
/// - `default-devfile.yaml`: The devfile used when the user continues with
///   the default configuration
/// - `scenarios/*.yaml`: Replay scenarios
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub loader: LoaderConfig,
    pub default_devfile: Option<Devfile>,
    pub scenarios: Vec<Scenario>,
}

/// Effective timeouts and policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    pub stop_timeout: Duration,
    pub start_timeout: Duration,
    pub url_timeout: Duration,
    pub resolve_timeout: Duration,
    pub create_timeout: Duration,
    pub min_step_duration: Duration,
    pub reloads_limit: u32,
    pub verify_ide_endpoint: bool,
    pub endpoint_recheck: Duration,
    pub running_workspaces_limit: u32,
    pub dashboard_origin: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::resolve(&LoaderConfig::default(), &ServerSettings::default())
    }
}

impl LoaderSettings {
    /// Merges local config over cluster settings over fallbacks.
    pub fn resolve(local: &LoaderConfig, server: &ServerSettings) -> Self {
        let secs = Duration::from_secs;
        let millis = Duration::from_millis;

        Self {
            stop_timeout: secs(local.stop_timeout_sec.unwrap_or(DEFAULT_STOP_TIMEOUT_SEC)),
            start_timeout: secs(
                local
                    .start_timeout_sec
                    .or(server.start_timeout_sec)
                    .unwrap_or(DEFAULT_START_TIMEOUT_SEC),
            ),
            url_timeout: secs(local.url_timeout_sec.unwrap_or(DEFAULT_URL_TIMEOUT_SEC)),
            resolve_timeout: secs(
                local
                    .resolve_timeout_sec
                    .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SEC),
            ),
            create_timeout: secs(local.create_timeout_sec.unwrap_or(DEFAULT_CREATE_TIMEOUT_SEC)),
            min_step_duration: millis(
                local
                    .min_step_duration_ms
                    .unwrap_or(DEFAULT_MIN_STEP_DURATION_MS),
            ),
            reloads_limit: local.reloads_limit.unwrap_or(DEFAULT_RELOADS_LIMIT),
            verify_ide_endpoint: local.verify_ide_endpoint.unwrap_or(false),
            endpoint_recheck: millis(
                local
                    .endpoint_recheck_ms
                    .unwrap_or(DEFAULT_ENDPOINT_RECHECK_MS),
            ),
            running_workspaces_limit: local
                .running_workspaces_limit
                .or(server.running_workspaces_limit)
                .unwrap_or(DEFAULT_RUNNING_WORKSPACES_LIMIT),
            dashboard_origin: local
                .dashboard_origin
                .clone()
                .or_else(|| server.dashboard_origin.clone())
                .unwrap_or_else(|| DEFAULT_DASHBOARD_ORIGIN.to_string()),
        }
    }
}
