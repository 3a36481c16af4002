//! Start workspace step.

use async_trait::async_trait;

use crate::error::LoaderError;
use crate::runners::{
    CollaboratorCall, SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec,
};
use wl_protocol::factory_models::{Devfile, DevfileMetadata};
use wl_protocol::workspace_models::WorkspaceStatus;

pub struct StartWorkspaceRunner;

#[async_trait]
impl StepRunner for StartWorkspaceRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        let workspace = ctx.target_workspace()?;
        let status = workspace.status;

        let wait = WaitSpec::bounded(
            "start",
            ctx.settings.start_timeout,
            LoaderError::StatusTimeout {
                status,
                seconds: ctx.settings.start_timeout.as_secs(),
            },
        );

        if ctx.facts.devfile_update_pending {
            return Ok(StepVerdict::Wait(wait));
        }
        if ctx.facts.update_with_default_devfile {
            let devfile = ctx.default_devfile().cloned().unwrap_or_else(|| Devfile {
                metadata: DevfileMetadata {
                    name: workspace.name.clone(),
                    generate_name: None,
                },
                ..Devfile::default()
            });
            return Ok(StepVerdict::Request {
                call: CollaboratorCall::UpdateDevfile {
                    workspace: workspace.params(),
                    devfile,
                },
                then: wait,
            });
        }

        match status {
            WorkspaceStatus::Running => {
                effects.push(SessionEffect::ShouldStart(false));
                Ok(StepVerdict::Advance)
            }
            WorkspaceStatus::Starting => {
                effects.push(SessionEffect::ShouldStart(false));
                Ok(StepVerdict::Wait(wait))
            }
            WorkspaceStatus::Stopped | WorkspaceStatus::Failed if ctx.facts.should_start => {
                if ctx.facts.start_requested {
                    // the cluster has not reported the start yet
                    Ok(StepVerdict::Wait(wait))
                } else {
                    Ok(StepVerdict::Request {
                        call: CollaboratorCall::Start(workspace.params()),
                        then: wait,
                    })
                }
            }
            _ => Err(LoaderError::UnexpectedTransition {
                status,
                reason: ctx.last_error_line(),
            }),
        }
    }
}
