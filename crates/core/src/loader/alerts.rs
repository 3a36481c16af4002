//! Alert construction.
//!
//! Exactly one alert is shown at a time. It is derived from the failure of
//! the current step: recoverable failures get a warning with actions that
//! resolve them, everything else a danger alert offering a restart.

use crate::error::{FailureKind, LoaderError};
use wl_protocol::alert_models::{AlertAction, AlertActionKind, AlertItem, AlertVariant};
use wl_protocol::step_models::{FlowKind, LoadingStep};

fn alert_key(flow: FlowKind, step: LoadingStep) -> String {
    let prefix = match flow {
        FlowKind::OpenExisting => "ide-loader",
        FlowKind::ImportFromUrl(_) => "factory-loader",
    };
    let step = match step {
        LoadingStep::Initialize => "initialize",
        LoadingStep::CheckRunningWorkspacesLimit => "check-running-workspaces-limit",
        LoadingStep::CreateWorkspace => "create-workspace",
        LoadingStep::CreateWorkspaceFetchDevfile => "fetch-devfile",
        LoadingStep::CreateWorkspaceFetchResources => "fetch-resources",
        LoadingStep::CreateWorkspaceCheckExistingWorkspaces => "check-existing-workspaces",
        LoadingStep::CreateWorkspaceApplyDevfile => "apply-devfile",
        LoadingStep::CreateWorkspaceApplyResources => "apply-resources",
        LoadingStep::StartWorkspace => "start-workspace",
        LoadingStep::OpenWorkspace => "open-workspace",
    };
    format!("{prefix}-{step}")
}

/// Builds the alert for `error` raised by `step`.
pub fn build_alert(error: &LoaderError, flow: FlowKind, step: LoadingStep) -> AlertItem {
    let key = alert_key(flow, step);
    let body = error.to_string();

    if error.kind() == FailureKind::Warning {
        let (title, actions) = warning_actions(error);
        return AlertItem {
            key,
            title: title.to_string(),
            variant: AlertVariant::Warning,
            body,
            actions,
        };
    }

    let creating = matches!(flow, FlowKind::ImportFromUrl(_))
        && !matches!(step, LoadingStep::StartWorkspace | LoadingStep::OpenWorkspace);

    let (title, actions) = if creating {
        (
            "Failed to create the workspace",
            vec![AlertAction::new("Click to try again", AlertActionKind::Restart)],
        )
    } else {
        let mut actions = vec![AlertAction::new("Restart", AlertActionKind::Restart)];
        if step == LoadingStep::StartWorkspace {
            actions.push(AlertAction::new(
                "Restart with default devfile",
                AlertActionKind::RestartWithDefaultDevfile,
            ));
        }
        actions.push(AlertAction::new(
            "Open in Verbose mode",
            AlertActionKind::RestartVerbose,
        ));
        ("Failed to open the workspace", actions)
    };

    AlertItem {
        key,
        title: title.to_string(),
        variant: AlertVariant::Danger,
        body,
        actions,
    }
}

fn warning_actions(error: &LoaderError) -> (&'static str, Vec<AlertAction>) {
    match error {
        LoaderError::NameConflict { existing } => (
            "Existing workspace found",
            vec![
                AlertAction::new(
                    "Open the existing workspace",
                    AlertActionKind::OpenExistingWorkspace(existing.clone()),
                ),
                AlertAction::new("Create a new workspace", AlertActionKind::CreateNewWorkspace),
            ],
        ),
        LoaderError::RunningLimit { running, .. } => {
            let actions = match running.as_slice() {
                [only] => vec![
                    AlertAction::new(
                        format!(
                            "Close running workspace ({}) and restart",
                            only.workspace_name
                        ),
                        AlertActionKind::StopRunningWorkspace(only.clone()),
                    ),
                    AlertAction::new(
                        format!(
                            "Switch to running workspace ({}) to save any changes",
                            only.workspace_name
                        ),
                        AlertActionKind::SwitchToWorkspace(only.clone()),
                    ),
                ],
                _ => vec![AlertAction::new(
                    "Return to dashboard",
                    AlertActionKind::ReturnToDashboard,
                )],
            };
            ("Running workspace(s) found.", actions)
        }
        _ => (
            "Warning",
            vec![
                AlertAction::new(
                    "Continue with the default devfile",
                    AlertActionKind::ContinueWithDefaultDevfile,
                ),
                AlertAction::new("Reload", AlertActionKind::Reload),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wl_protocol::step_models::FactorySource;
    use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceStatus};

    fn titles(alert: &AlertItem) -> Vec<&str> {
        alert.actions.iter().map(|a| a.title.as_str()).collect()
    }

    #[test]
    fn test_open_flow_failure_offers_restart() {
        let alert = build_alert(
            &LoaderError::StatusTimeout {
                status: WorkspaceStatus::Stopping,
                seconds: 60,
            },
            FlowKind::OpenExisting,
            LoadingStep::Initialize,
        );

        assert_eq!(alert.key, "ide-loader-initialize");
        assert_eq!(alert.variant, AlertVariant::Danger);
        assert_eq!(alert.title, "Failed to open the workspace");
        assert_eq!(
            alert.body,
            "The workspace status remains \"Stopping\" in the last 60 seconds."
        );
        assert_eq!(titles(&alert), ["Restart", "Open in Verbose mode"]);
    }

    #[test]
    fn test_start_failure_offers_default_devfile_restart() {
        let alert = build_alert(
            &LoaderError::StatusTimeout {
                status: WorkspaceStatus::Stopped,
                seconds: 300,
            },
            FlowKind::OpenExisting,
            LoadingStep::StartWorkspace,
        );

        assert_eq!(alert.key, "ide-loader-start-workspace");
        assert_eq!(
            titles(&alert),
            ["Restart", "Restart with default devfile", "Open in Verbose mode"]
        );
        assert_eq!(
            alert.actions[1].kind,
            AlertActionKind::RestartWithDefaultDevfile
        );
    }

    #[test]
    fn test_factory_creation_failure() {
        let flow = FlowKind::ImportFromUrl(FactorySource::Devfile);
        let alert = build_alert(
            &LoaderError::upstream("Not found."),
            flow,
            LoadingStep::CreateWorkspaceFetchDevfile,
        );
        assert_eq!(alert.key, "factory-loader-fetch-devfile");
        assert_eq!(alert.title, "Failed to create the workspace");
        assert_eq!(titles(&alert), ["Click to try again"]);

        let alert = build_alert(
            &LoaderError::UrlTimeout { seconds: 20 },
            flow,
            LoadingStep::OpenWorkspace,
        );
        assert_eq!(alert.title, "Failed to open the workspace");
    }

    #[test]
    fn test_devfile_warnings_offer_default_devfile() {
        let alert = build_alert(
            &LoaderError::UnsupportedGitProvider("Failed to fetch devfile".to_string()),
            FlowKind::ImportFromUrl(FactorySource::Devfile),
            LoadingStep::CreateWorkspaceFetchDevfile,
        );
        assert_eq!(alert.variant, AlertVariant::Warning);
        assert_eq!(alert.title, "Warning");
        assert_eq!(
            alert.actions[0].kind,
            AlertActionKind::ContinueWithDefaultDevfile
        );
        assert_eq!(alert.actions[1].kind, AlertActionKind::Reload);
    }

    #[test]
    fn test_running_limit_actions() {
        let other = WorkspaceParams::new("user-che", "other");
        let alert = build_alert(
            &LoaderError::RunningLimit {
                limit: 1,
                running: vec![other.clone()],
            },
            FlowKind::OpenExisting,
            LoadingStep::CheckRunningWorkspacesLimit,
        );
        assert_eq!(alert.title, "Running workspace(s) found.");
        assert_eq!(
            titles(&alert),
            [
                "Close running workspace (other) and restart",
                "Switch to running workspace (other) to save any changes"
            ]
        );
        assert_eq!(
            alert.actions[0].kind,
            AlertActionKind::StopRunningWorkspace(other)
        );

        let alert = build_alert(
            &LoaderError::RunningLimit {
                limit: 2,
                running: vec![
                    WorkspaceParams::new("user-che", "a"),
                    WorkspaceParams::new("user-che", "b"),
                ],
            },
            FlowKind::OpenExisting,
            LoadingStep::CheckRunningWorkspacesLimit,
        );
        assert_eq!(titles(&alert), ["Return to dashboard"]);
    }

    #[test]
    fn test_name_conflict_actions() {
        let existing = WorkspaceParams::new("user-che", "che-dashboard");
        let alert = build_alert(
            &LoaderError::NameConflict {
                existing: existing.clone(),
            },
            FlowKind::ImportFromUrl(FactorySource::Devfile),
            LoadingStep::CreateWorkspaceCheckExistingWorkspaces,
        );
        assert_eq!(alert.title, "Existing workspace found");
        assert_eq!(
            alert.actions[0].kind,
            AlertActionKind::OpenExistingWorkspace(existing)
        );
        assert_eq!(alert.actions[1].kind, AlertActionKind::CreateNewWorkspace);
    }
}
