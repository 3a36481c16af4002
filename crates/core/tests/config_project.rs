//! Loading a `.ws-loader/` project and replaying its scenarios.

mod common;

use common::*;
use std::time::Duration;
use wl_core::config::loader::load_config;
use wl_core::config::models::LoaderSettings;
use wl_core::loader::LoaderOptions;
use wl_core::replay::replay;
use wl_protocol::config_models::ServerSettings;

#[tokio::test]
async fn test_project_config_is_loaded() {
    let project = create_test_project().expect("create test project");

    let config = load_config(project.path()).await.expect("config loads");

    assert_eq!(config.loader.stop_timeout_sec, Some(30));
    assert_eq!(
        config
            .default_devfile
            .as_ref()
            .map(|d| d.metadata.name.as_str()),
        Some("empty")
    );
    assert_eq!(config.scenarios.len(), 1);
    assert_eq!(config.scenarios[0].name, "open-running");

    let settings = LoaderSettings::resolve(
        &config.loader,
        &ServerSettings {
            start_timeout_sec: Some(600),
            ..ServerSettings::default()
        },
    );
    assert_eq!(settings.stop_timeout, Duration::from_secs(30));
    assert_eq!(settings.start_timeout, Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn test_project_scenario_replays() {
    let project = create_test_project().expect("create test project");
    let config = load_config(project.path()).await.expect("config loads");

    let report = replay(&config.scenarios[0], LoaderOptions::from(&config))
        .await
        .expect("replay succeeds");

    assert_eq!(report.navigated_to(), Some("https://ide"));
    assert!(report.final_alert().is_none());
}
