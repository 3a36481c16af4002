//! Check existing workspaces step: detects name collisions before creation.

use async_trait::async_trait;

use crate::error::LoaderError;
use crate::runners::{SessionEffect, StepContext, StepRunner, StepVerdict};
use wl_protocol::factory_models::PoliciesCreate;
use wl_protocol::step_models::{FactorySource, FlowKind};

pub struct CheckExistingRunner;

#[async_trait]
impl StepRunner for CheckExistingRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        _effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        let Some(params) = ctx.factory_params() else {
            return Ok(StepVerdict::Advance);
        };
        if ctx.facts.create_new_confirmed || params.policy() == PoliciesCreate::Perclick {
            return Ok(StepVerdict::Advance);
        }

        let name = match ctx.flow() {
            FlowKind::ImportFromUrl(FactorySource::PrebuiltResources) => ctx
                .facts
                .resources
                .as_ref()
                .and_then(|r| r.workspace_name())
                .map(str::to_string)
                .ok_or_else(|| LoaderError::upstream("Failed to fetch devworkspace resources."))?,
            _ => match &ctx.facts.resolution {
                Some(resolution) => resolution.devfile.metadata.name.clone(),
                None if ctx.facts.use_default_devfile => return Ok(StepVerdict::Advance),
                None => return Err(LoaderError::upstream("Failed to resolve the devfile.")),
            },
        };

        let source = params.source_annotation();
        let existing = ctx.snapshot.workspaces.iter().find(|w| w.name == name);

        match existing {
            None => Ok(StepVerdict::Advance),
            // the same factory under `peruser` is reused by the apply step
            Some(w) if w.source.as_deref() == Some(source.as_str()) => Ok(StepVerdict::Advance),
            Some(w) => Err(LoaderError::NameConflict {
                existing: w.params(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::mock::MockCluster;
    use crate::runners::test_support::{context, run};
    use std::sync::Arc;
    use wl_protocol::factory_models::{
        Devfile, DevfileMetadata, FactoryParams, FactoryResolution,
    };
    use wl_protocol::ipc::MatchParams;
    use wl_protocol::step_models::LoadingStep;
    use wl_protocol::workspace_models::{
        ClusterSnapshot, WorkspaceParams, WorkspaceSnapshot, WorkspaceStatus,
    };

    const URL: &str = "https://github.com/eclipse-che/che-dashboard";

    fn ctx_with(existing: Option<WorkspaceSnapshot>, policy: &str) -> StepContext {
        let snapshot = ClusterSnapshot {
            workspaces: existing.into_iter().collect(),
            ..ClusterSnapshot::default()
        };
        let params = MatchParams::Factory(FactoryParams {
            source_url: URL.to_string(),
            policies_create: policy.to_string(),
            ..FactoryParams::default()
        });
        let mut ctx = context(
            LoadingStep::CreateWorkspaceCheckExistingWorkspaces,
            params,
            snapshot,
            Arc::new(MockCluster::healthy()),
        );
        ctx.facts.resolution = Some(FactoryResolution {
            location: URL.to_string(),
            source: Some("devfile.yaml".to_string()),
            devfile: Devfile {
                metadata: DevfileMetadata {
                    name: "che-dashboard".to_string(),
                    generate_name: None,
                },
                ..Devfile::default()
            },
            converted: false,
        });
        ctx
    }

    fn workspace(source: Option<&str>) -> WorkspaceSnapshot {
        let mut workspace =
            WorkspaceSnapshot::new("user-che", "che-dashboard", WorkspaceStatus::Stopped);
        workspace.source = source.map(str::to_string);
        workspace
    }

    #[tokio::test]
    async fn test_no_collision_advances() {
        let ctx = ctx_with(None, "peruser");
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }

    #[tokio::test]
    async fn test_foreign_workspace_with_same_name_conflicts() {
        let ctx = ctx_with(Some(workspace(None)), "peruser");
        assert_eq!(
            run(&ctx).await.0,
            Err(LoaderError::NameConflict {
                existing: WorkspaceParams::new("user-che", "che-dashboard"),
            })
        );
    }

    #[tokio::test]
    async fn test_same_source_under_peruser_advances() {
        let ctx = ctx_with(Some(workspace(Some(&format!("url={URL}")))), "peruser");
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }

    #[tokio::test]
    async fn test_perclick_and_confirmation_skip_check() {
        let ctx = ctx_with(Some(workspace(None)), "perclick");
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));

        let mut ctx = ctx_with(Some(workspace(None)), "peruser");
        ctx.facts.create_new_confirmed = true;
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }

    #[tokio::test]
    async fn test_missing_resolution_fails() {
        let mut ctx = ctx_with(None, "peruser");
        ctx.facts.resolution = None;
        assert_eq!(
            run(&ctx).await.0,
            Err(LoaderError::upstream("Failed to resolve the devfile."))
        );

        ctx.facts.use_default_devfile = true;
        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }
}
