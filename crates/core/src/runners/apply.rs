//! Apply steps: create the workspace from a devfile or pre-built resources.
//!
//! The runner never creates anything itself. It prepares a draft and asks
//! the controller to create it, then waits for the new workspace to show up
//! in a snapshot.

use async_trait::async_trait;

use crate::error::LoaderError;
use crate::runners::initialize::NAMESPACE_REQUIRED;
use crate::runners::prepare::{prepare_devfile, prepare_resources};
use crate::runners::{
    CollaboratorCall, SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec,
};
use wl_protocol::factory_models::{FactoryParams, PoliciesCreate, WorkspaceDraft};
use wl_protocol::step_models::FactorySource;
use wl_protocol::workspace_models::WorkspaceSnapshot;

pub struct ApplyDevfileRunner;

pub struct ApplyResourcesRunner;

#[async_trait]
impl StepRunner for ApplyDevfileRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        apply(ctx, FactorySource::Devfile, effects)
    }
}

#[async_trait]
impl StepRunner for ApplyResourcesRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        apply(ctx, FactorySource::PrebuiltResources, effects)
    }
}

fn apply(
    ctx: &StepContext,
    source: FactorySource,
    effects: &mut Vec<SessionEffect>,
) -> Result<StepVerdict, LoaderError> {
    let Some(params) = ctx.factory_params() else {
        return Ok(StepVerdict::Advance);
    };

    if let Some(workspace) = find_created(ctx, params) {
        effects.push(SessionEffect::SetTarget(workspace.params()));
        if let Some(warning) = &workspace.warning {
            effects.push(SessionEffect::SetWarning(warning.clone()));
        }
        return Ok(StepVerdict::Advance);
    }

    if ctx.facts.create_failed {
        return Err(LoaderError::upstream(
            "The workspace creation unexpectedly failed.",
        ));
    }

    let wait = WaitSpec::bounded(
        "create",
        ctx.settings.create_timeout,
        LoaderError::CreateTimeout {
            seconds: ctx.settings.create_timeout.as_secs(),
        },
    );
    if ctx.facts.create_requested {
        return Ok(StepVerdict::Wait(wait));
    }

    let namespace = ctx
        .snapshot
        .namespaces
        .first()
        .cloned()
        .ok_or_else(|| LoaderError::upstream(NAMESPACE_REQUIRED))?;

    let draft = match source {
        FactorySource::Devfile => draft_from_devfile(ctx, params, &namespace)?,
        FactorySource::PrebuiltResources => ctx
            .facts
            .resources
            .as_ref()
            .and_then(|r| prepare_resources(r, params, &namespace, &ctx.snapshot))
            .ok_or_else(|| LoaderError::upstream("Failed to fetch devworkspace resources."))?,
    };

    Ok(StepVerdict::Request {
        call: CollaboratorCall::Create { namespace, draft },
        then: wait,
    })
}

fn draft_from_devfile(
    ctx: &StepContext,
    params: &FactoryParams,
    namespace: &str,
) -> Result<WorkspaceDraft, LoaderError> {
    let use_default = ctx.facts.use_default_devfile;
    let devfile = if use_default {
        ctx.default_devfile()
            .ok_or_else(|| LoaderError::upstream("Failed to resolve the default devfile."))?
    } else {
        ctx.facts
            .resolution
            .as_ref()
            .map(|r| &r.devfile)
            .ok_or_else(|| LoaderError::upstream("Failed to resolve the devfile."))?
    };

    Ok(prepare_devfile(
        devfile,
        params,
        namespace,
        &ctx.snapshot,
        use_default,
    ))
}

/// The workspace this step created, or the one created earlier from the
/// same factory under `peruser`.
fn find_created<'a>(ctx: &'a StepContext, params: &FactoryParams) -> Option<&'a WorkspaceSnapshot> {
    if ctx.facts.draft.is_some() {
        if let Some(found) = ctx.facts.target.as_ref().and_then(|t| ctx.snapshot.find(t)) {
            return Some(found);
        }
    }

    if params.policy() != PoliciesCreate::Peruser {
        return None;
    }
    let source = params.source_annotation();
    ctx.snapshot
        .workspaces
        .iter()
        .find(|w| w.source.as_deref() == Some(source.as_str()))
}
