//! Running workspaces limit step.

use async_trait::async_trait;

use crate::error::LoaderError;
use crate::runners::{
    CollaboratorCall, SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec,
};
use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceStatus};

pub struct RunningLimitRunner;

#[async_trait]
impl StepRunner for RunningLimitRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        if let Some(redundant) = &ctx.facts.redundant_workspace {
            return Ok(stop_redundant(ctx, redundant, effects));
        }

        let target = ctx.facts.target.as_ref();
        let target_running = target
            .and_then(|t| ctx.snapshot.find(t))
            .is_some_and(|w| matches!(w.status, WorkspaceStatus::Starting | WorkspaceStatus::Running));
        if target_running {
            return Ok(StepVerdict::Advance);
        }

        let limit = ctx.settings.running_workspaces_limit;
        let running: Vec<WorkspaceParams> = ctx
            .snapshot
            .running()
            .map(|w| w.params())
            .filter(|p| Some(p) != target)
            .collect();

        if limit > 0 && running.len() >= limit as usize {
            return Err(LoaderError::RunningLimit { limit, running });
        }

        Ok(StepVerdict::Advance)
    }
}

fn stop_redundant(
    ctx: &StepContext,
    redundant: &WorkspaceParams,
    effects: &mut Vec<SessionEffect>,
) -> StepVerdict {
    let Some(workspace) = ctx.snapshot.find(redundant) else {
        retitle(ctx, ", the redundant workspace has been removed", effects);
        return StepVerdict::Advance;
    };

    let name = &redundant.workspace_name;
    let wait = WaitSpec::bounded(
        "stop-redundant",
        ctx.settings.stop_timeout,
        LoaderError::StatusTimeout {
            status: workspace.status,
            seconds: ctx.settings.stop_timeout.as_secs(),
        },
    );

    match workspace.status {
        WorkspaceStatus::Stopped | WorkspaceStatus::Failed => {
            retitle(ctx, &format!(", workspace {name} has been stopped"), effects);
            StepVerdict::Advance
        }
        WorkspaceStatus::Starting | WorkspaceStatus::Running if !ctx.facts.stop_requested => {
            retitle(ctx, &format!(", waiting for {name} to stop"), effects);
            StepVerdict::Request {
                call: CollaboratorCall::Stop(redundant.clone()),
                then: wait,
            }
        }
        _ => StepVerdict::Wait(wait),
    }
}

fn retitle(ctx: &StepContext, suffix: &str, effects: &mut Vec<SessionEffect>) {
    if ctx.title.ends_with(suffix) {
        return;
    }
    effects.push(SessionEffect::SetTitle(format!(
        "{}{suffix}",
        ctx.step.default_title()
    )));
}
