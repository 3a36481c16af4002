//! Fetch resources step: downloads pre-built DevWorkspace resources.

use async_trait::async_trait;

use crate::error::{LoaderError, ResolverError};
use crate::runners::{
    CollaboratorCall, SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec,
};

pub struct FetchResourcesRunner;

#[async_trait]
impl StepRunner for FetchResourcesRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        let Some(params) = ctx.factory_params() else {
            return Ok(StepVerdict::Advance);
        };
        let url = params.source_url.as_str();

        if ctx.facts.resources.is_some() {
            return Ok(StepVerdict::Advance);
        }
        if let Some(resources) = ctx.snapshot.prebuilt_resources.get(url) {
            effects.push(SessionEffect::StoreResources(resources.clone()));
            return Ok(StepVerdict::Advance);
        }

        match &ctx.facts.resources_reply {
            Some(Ok(resources)) => {
                effects.push(SessionEffect::StoreResources(resources.clone()));
                Ok(StepVerdict::Advance)
            }
            Some(Err(err @ ResolverError::OAuthRequired { .. })) => {
                Err(LoaderError::Upstream(err.to_string()))
            }
            Some(Err(ResolverError::Failed(message))) => {
                Err(LoaderError::Upstream(message.clone()))
            }
            None => {
                let wait = WaitSpec::bounded(
                    "resolve",
                    ctx.settings.resolve_timeout,
                    LoaderError::FetchTimeout {
                        seconds: ctx.settings.resolve_timeout.as_secs(),
                    },
                );
                if ctx.facts.resolve_requested {
                    Ok(StepVerdict::Wait(wait))
                } else {
                    Ok(StepVerdict::Request {
                        call: CollaboratorCall::FetchResources(url.to_string()),
                        then: wait,
                    })
                }
            }
        }
    }
}
