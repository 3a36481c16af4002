//! Initialize step: validates the target before anything is changed.

use async_trait::async_trait;

use crate::error::LoaderError;
use crate::runners::{SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec};
use wl_protocol::factory_models::{FactoryParams, PoliciesCreate};
use wl_protocol::ipc::MatchParams;
use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceStatus};

pub struct InitializeRunner;

#[async_trait]
impl StepRunner for InitializeRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        match &ctx.params {
            MatchParams::Workspace(params) => initialize_workspace(ctx, params, effects).await,
            MatchParams::Factory(params) => initialize_factory(ctx, params),
        }
    }
}

async fn initialize_workspace(
    ctx: &StepContext,
    params: &WorkspaceParams,
    effects: &mut Vec<SessionEffect>,
) -> Result<StepVerdict, LoaderError> {
    let workspace = match ctx.snapshot.find(params) {
        Some(workspace) => workspace.clone(),
        // the store may not have caught up yet
        None => ctx
            .collaborators
            .client
            .resolve_workspace(params)
            .await?
            .ok_or_else(|| LoaderError::WorkspaceNotFound(params.clone()))?,
    };

    if workspace.is_deprecated {
        return Err(LoaderError::upstream(
            "The workspace is deprecated. Convert the workspace and try again.",
        ));
    }

    match workspace.status {
        WorkspaceStatus::Terminating => Err(LoaderError::upstream(
            "The workspace is terminating and cannot be open.",
        )),
        WorkspaceStatus::Stopping | WorkspaceStatus::Failing => {
            Ok(StepVerdict::Wait(WaitSpec::bounded(
                "stop",
                ctx.settings.stop_timeout,
                LoaderError::StatusTimeout {
                    status: workspace.status,
                    seconds: ctx.settings.stop_timeout.as_secs(),
                },
            )))
        }
        _ => {
            effects.push(SessionEffect::SetTarget(params.clone()));
            Ok(StepVerdict::Advance)
        }
    }
}

fn initialize_factory(
    ctx: &StepContext,
    params: &FactoryParams,
) -> Result<StepVerdict, LoaderError> {
    if params.source_url.is_empty() {
        if params.use_devworkspace_resources {
            return Err(LoaderError::upstream("Devworkspace resources URL is missing."));
        }
        return Err(LoaderError::Upstream(format!(
            "Repository/Devfile URL is missing. Please specify it via url query param: {}/dashboard/#/load-factory?url=your-repository-url",
            ctx.settings.dashboard_origin.trim_end_matches('/')
        )));
    }

    if params.error_code.as_deref() == Some("invalid_request") {
        return Err(LoaderError::upstream(
            "Could not resolve devfile from private repository because authentication request is missing a parameter, contains an invalid parameter, includes a parameter more than once, or is otherwise invalid.",
        ));
    }

    if PoliciesCreate::parse(&params.policies_create).is_none() {
        return Err(LoaderError::Upstream(format!(
            "Unsupported create policy '{}' is specified while the only following are supported: peruser, perclick. Please fix 'policies.create' parameter and try again.",
            params.policies_create
        )));
    }

    if ctx.snapshot.namespaces.is_empty() {
        return Err(LoaderError::upstream(NAMESPACE_REQUIRED));
    }

    Ok(StepVerdict::Advance)
}

pub(crate) const NAMESPACE_REQUIRED: &str = "Failed to accept the factory URL. The infrastructure namespace is required to be created. Please create a regular workspace to workaround the issue and open factory URL again.";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::mock::{MockCall, MockCluster};
    use crate::runners::test_support::{context, run};
    use std::sync::Arc;
    use std::time::Duration;
    use wl_protocol::step_models::LoadingStep;
    use wl_protocol::workspace_models::{ClusterSnapshot, WorkspaceSnapshot};

    fn open(status: WorkspaceStatus) -> (ClusterSnapshot, MatchParams) {
        let snapshot = ClusterSnapshot {
            workspaces: vec![WorkspaceSnapshot::new("user-che", "wksp", status)],
            ..ClusterSnapshot::default()
        };
        (
            snapshot,
            MatchParams::Workspace(WorkspaceParams::new("user-che", "wksp")),
        )
    }

    #[tokio::test]
    async fn test_stopped_workspace_advances() {
        let (snapshot, params) = open(WorkspaceStatus::Stopped);
        let ctx = context(
            LoadingStep::Initialize,
            params,
            snapshot,
            Arc::new(MockCluster::healthy()),
        );

        let (result, effects) = run(&ctx).await;
        assert_eq!(result, Ok(StepVerdict::Advance));
        assert_eq!(
            effects,
            vec![SessionEffect::SetTarget(WorkspaceParams::new("user-che", "wksp"))]
        );
    }

    #[tokio::test]
    async fn test_stopping_workspace_waits_for_stop_timeout() {
        let (snapshot, params) = open(WorkspaceStatus::Stopping);
        let ctx = context(
            LoadingStep::Initialize,
            params,
            snapshot,
            Arc::new(MockCluster::healthy()),
        );

        let (result, _) = run(&ctx).await;
        let Ok(StepVerdict::Wait(wait)) = result else {
            panic!("Expected a wait, got {result:?}");
        };
        assert_eq!(wait.budget, Some(Duration::from_secs(60)));
        assert_eq!(
            wait.on_timeout.map(|e| e.to_string()),
            Some("The workspace status remains \"Stopping\" in the last 60 seconds.".to_string())
        );
    }

    #[tokio::test]
    async fn test_terminating_and_deprecated_fail() {
        let (snapshot, params) = open(WorkspaceStatus::Terminating);
        let ctx = context(
            LoadingStep::Initialize,
            params.clone(),
            snapshot,
            Arc::new(MockCluster::healthy()),
        );
        let (result, _) = run(&ctx).await;
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("The workspace is terminating and cannot be open.".to_string())
        );

        let (mut snapshot, _) = open(WorkspaceStatus::Running);
        snapshot.workspaces[0].is_deprecated = true;
        let ctx = context(
            LoadingStep::Initialize,
            params,
            snapshot,
            Arc::new(MockCluster::healthy()),
        );
        let (result, _) = run(&ctx).await;
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("The workspace is deprecated. Convert the workspace and try again.".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_workspace_is_looked_up_then_not_found() {
        let mock = Arc::new(MockCluster::healthy());
        let params = MatchParams::Workspace(WorkspaceParams::new("user-che", "missing"));
        let ctx = context(
            LoadingStep::Initialize,
            params,
            ClusterSnapshot::default(),
            mock.clone(),
        );

        let (result, _) = run(&ctx).await;
        assert_eq!(
            result.map_err(|e| e.to_string()),
            Err("Workspace \"user-che/missing\" not found.".to_string())
        );
        assert_eq!(
            mock.calls(),
            vec![MockCall::ResolveWorkspace(WorkspaceParams::new(
                "user-che", "missing"
            ))]
        );
    }

    #[tokio::test]
    async fn test_workspace_found_by_client_advances() {
        let mock = Arc::new(MockCluster::healthy().with_workspaces(vec![
            WorkspaceSnapshot::new("user-che", "fresh", WorkspaceStatus::Stopped),
        ]));
        let params = MatchParams::Workspace(WorkspaceParams::new("user-che", "fresh"));
        let ctx = context(LoadingStep::Initialize, params, ClusterSnapshot::default(), mock);

        let (result, _) = run(&ctx).await;
        assert_eq!(result, Ok(StepVerdict::Advance));
    }

    fn factory(params: FactoryParams, namespaces: Vec<String>) -> StepContext {
        let snapshot = ClusterSnapshot {
            namespaces,
            ..ClusterSnapshot::default()
        };
        context(
            LoadingStep::Initialize,
            MatchParams::Factory(params),
            snapshot,
            Arc::new(MockCluster::healthy()),
        )
    }

    #[tokio::test]
    async fn test_factory_validation() {
        let namespaces = vec!["user-che".to_string()];

        let ctx = factory(
            FactoryParams {
                use_devworkspace_resources: true,
                ..FactoryParams::default()
            },
            namespaces.clone(),
        );
        assert_eq!(
            run(&ctx).await.0.map_err(|e| e.to_string()),
            Err("Devworkspace resources URL is missing.".to_string())
        );

        let ctx = factory(FactoryParams::default(), namespaces.clone());
        let message = run(&ctx).await.0.expect_err("missing url").to_string();
        assert!(message.starts_with("Repository/Devfile URL is missing."));

        let ctx = factory(
            FactoryParams {
                source_url: "https://repo".to_string(),
                error_code: Some("invalid_request".to_string()),
                ..FactoryParams::default()
            },
            namespaces.clone(),
        );
        let message = run(&ctx).await.0.expect_err("invalid request").to_string();
        assert!(message.starts_with("Could not resolve devfile from private repository"));

        let ctx = factory(
            FactoryParams {
                source_url: "https://repo".to_string(),
                policies_create: "perworkspace".to_string(),
                ..FactoryParams::default()
            },
            namespaces.clone(),
        );
        let message = run(&ctx).await.0.expect_err("bad policy").to_string();
        assert!(message.starts_with("Unsupported create policy 'perworkspace'"));

        let ctx = factory(
            FactoryParams {
                source_url: "https://repo".to_string(),
                ..FactoryParams::default()
            },
            Vec::new(),
        );
        assert_eq!(
            run(&ctx).await.0,
            Err(LoaderError::upstream(NAMESPACE_REQUIRED))
        );

        let ctx = factory(
            FactoryParams {
                source_url: "https://repo".to_string(),
                ..FactoryParams::default()
            },
            namespaces,
        );
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }
}
