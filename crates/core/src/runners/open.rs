//! Open workspace step: waits for the IDE URL and hands it over.

use async_trait::async_trait;
use tracing::debug;

use crate::error::LoaderError;
use crate::runners::{SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec};
use wl_protocol::workspace_models::WorkspaceStatus;

pub struct OpenWorkspaceRunner;

#[async_trait]
impl StepRunner for OpenWorkspaceRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        _effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        let workspace = ctx.target_workspace()?;

        if workspace.status != WorkspaceStatus::Running {
            return Err(LoaderError::UnexpectedTransition {
                status: workspace.status,
                reason: ctx.last_error_line(),
            });
        }

        let wait = WaitSpec::bounded(
            "ide-url",
            ctx.settings.url_timeout,
            LoaderError::UrlTimeout {
                seconds: ctx.settings.url_timeout.as_secs(),
            },
        );

        let Some(url) = &workspace.ide_url else {
            return Ok(StepVerdict::Wait(wait));
        };

        if ctx.settings.verify_ide_endpoint && !ctx.collaborators.probe.is_reachable(url).await {
            debug!(url, "IDE endpoint is not reachable yet");
            return Ok(StepVerdict::Wait(
                wait.recheck_after(ctx.settings.endpoint_recheck),
            ));
        }

        Ok(StepVerdict::Navigate(url.clone()))
    }
}
