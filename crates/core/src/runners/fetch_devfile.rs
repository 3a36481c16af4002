//! Fetch devfile step: resolves the factory URL to a devfile.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{LoaderError, ResolverError};
use crate::runners::{
    CollaboratorCall, SessionEffect, StepContext, StepRunner, StepVerdict, WaitSpec,
};
use wl_protocol::factory_models::FactoryResolution;

const SCHEMA_VALIDATION_FAILED: &str = "schema validation failed";
const UNSUPPORTED_PROVIDER: &str = "Failed to fetch devfile";

pub struct FetchDevfileRunner;

#[async_trait]
impl StepRunner for FetchDevfileRunner {
    async fn run(
        &self,
        ctx: &StepContext,
        effects: &mut Vec<SessionEffect>,
    ) -> Result<StepVerdict, LoaderError> {
        if ctx.facts.use_default_devfile {
            return Ok(StepVerdict::Advance);
        }

        let Some(params) = ctx.factory_params() else {
            return Ok(StepVerdict::Advance);
        };
        let url = params.source_url.as_str();

        let known = ctx
            .facts
            .resolution
            .as_ref()
            .or_else(|| ctx.snapshot.resolutions.get(url));
        if let Some(resolution) = known {
            effects.push(SessionEffect::SetTitle(resolution_title(url, resolution)));
            return Ok(StepVerdict::Advance);
        }

        let reply = match &ctx.facts.devfile_reply {
            Some(reply) => reply.clone(),
            None => {
                let wait = WaitSpec::bounded(
                    "resolve",
                    ctx.settings.resolve_timeout,
                    LoaderError::ResolveTimeout {
                        seconds: ctx.settings.resolve_timeout.as_secs(),
                    },
                );
                if ctx.facts.resolve_requested {
                    return Ok(StepVerdict::Wait(wait));
                }
                return Ok(StepVerdict::Request {
                    call: CollaboratorCall::ResolveDevfile(params.clone()),
                    then: wait,
                });
            }
        };

        match reply {
            Ok(resolution) => {
                effects.push(SessionEffect::ClearReloads);
                effects.push(SessionEffect::SetTitle(resolution_title(url, &resolution)));
                effects.push(SessionEffect::StoreResolution(resolution));
                Ok(StepVerdict::Advance)
            }
            Err(ResolverError::OAuthRequired { authentication_url }) => {
                let reloads = ctx.collaborators.reloads.count(url);
                if reloads >= ctx.settings.reloads_limit {
                    warn!(url, reloads, "reload limit reached");
                    return Err(LoaderError::ReloadLimit);
                }

                debug!(url, "authentication required, redirecting");
                effects.push(SessionEffect::RecordReload(url.to_string()));
                Ok(StepVerdict::Redirect {
                    authentication_url,
                    redirect_url: factory_redirect_url(&ctx.settings.dashboard_origin, url),
                })
            }
            Err(ResolverError::Failed(message)) => Err(classify(message)),
        }
    }
}

fn classify(message: String) -> LoaderError {
    if message.contains(SCHEMA_VALIDATION_FAILED) {
        LoaderError::InvalidDevfile(message)
    } else if message == UNSUPPORTED_PROVIDER {
        LoaderError::UnsupportedGitProvider(message)
    } else {
        LoaderError::Upstream(message)
    }
}

/// Title of the fetch step once the devfile is known.
pub fn resolution_title(url: &str, resolution: &FactoryResolution) -> String {
    let mut title = match &resolution.source {
        None => format!("Devfile could not be found in {url}. Applying the default configuration."),
        Some(file) if url.ends_with(file.as_str()) => format!("Devfile loaded from {url}."),
        Some(file) => format!("Devfile found in repo {url} as '{file}'."),
    };

    if resolution.converted {
        title.push_str(&format!(
            " Devfile version 1 found, converting it to devfile version {}.",
            resolution.devfile.schema_version
        ));
    }
    title
}

/// Where the authentication provider sends the user back to.
pub fn factory_redirect_url(origin: &str, factory_url: &str) -> String {
    format!(
        "{}/f?url={}",
        origin.trim_end_matches('/'),
        percent_encode(factory_url)
    )
}

/// Encodes everything but RFC 3986 unreserved characters.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::mock::MockCluster;
    use crate::runners::test_support::{context, run};
    use std::sync::Arc;
    use std::time::Duration;
    use wl_protocol::factory_models::{Devfile, FactoryParams};
    use wl_protocol::ipc::MatchParams;
    use wl_protocol::step_models::LoadingStep;
    use wl_protocol::workspace_models::ClusterSnapshot;

    const URL: &str = "https://github.com/eclipse-che/che-dashboard";

    fn factory_params() -> FactoryParams {
        FactoryParams {
            source_url: URL.to_string(),
            ..FactoryParams::default()
        }
    }

    fn resolution(source: Option<&str>, converted: bool) -> FactoryResolution {
        FactoryResolution {
            location: URL.to_string(),
            source: source.map(str::to_string),
            devfile: Devfile::default(),
            converted,
        }
    }

    fn fetch_ctx() -> StepContext {
        context(
            LoadingStep::CreateWorkspaceFetchDevfile,
            MatchParams::Factory(factory_params()),
            ClusterSnapshot::default(),
            Arc::new(MockCluster::healthy()),
        )
    }

    /// A fetch step whose resolve call has been answered with `reply`.
    fn answered(reply: Result<FactoryResolution, ResolverError>) -> StepContext {
        let mut ctx = fetch_ctx();
        ctx.facts.resolve_requested = true;
        ctx.facts.devfile_reply = Some(reply);
        ctx
    }

    #[test]
    fn test_titles() {
        assert_eq!(
            resolution_title(URL, &resolution(Some("devfile.yaml"), false)),
            "Devfile found in repo https://github.com/eclipse-che/che-dashboard as 'devfile.yaml'."
        );
        assert_eq!(
            resolution_title(URL, &resolution(None, false)),
            "Devfile could not be found in https://github.com/eclipse-che/che-dashboard. Applying the default configuration."
        );
        assert_eq!(
            resolution_title("https://host/devfile.yaml", &resolution(Some("devfile.yaml"), true)),
            "Devfile loaded from https://host/devfile.yaml. Devfile version 1 found, converting it to devfile version 2.2.0."
        );
    }

    #[test]
    fn test_redirect_url_is_encoded() {
        assert_eq!(
            factory_redirect_url("https://che.host/", "https://github.com/a/b?df=x y"),
            "https://che.host/f?url=https%3A%2F%2Fgithub.com%2Fa%2Fb%3Fdf%3Dx%20y"
        );
    }

    #[tokio::test]
    async fn test_resolver_is_asked_once() {
        let mut ctx = fetch_ctx();

        let (result, effects) = run(&ctx).await;
        let Ok(StepVerdict::Request { call, then }) = result else {
            panic!("Expected a resolve request, got {result:?}");
        };
        assert_eq!(call, CollaboratorCall::ResolveDevfile(factory_params()));
        assert_eq!(then.name, "resolve");
        assert_eq!(then.budget, Some(Duration::from_secs(20)));
        assert_eq!(
            then.on_timeout,
            Some(LoaderError::ResolveTimeout { seconds: 20 })
        );
        assert!(effects.is_empty());

        ctx.facts.resolve_requested = true;
        let (result, _) = run(&ctx).await;
        assert!(matches!(result, Ok(StepVerdict::Wait(ref w)) if w.name == "resolve"));
    }

    #[tokio::test]
    async fn test_resolved_devfile_is_stored() {
        let ctx = answered(Ok(resolution(Some("devfile.yaml"), false)));

        let (result, effects) = run(&ctx).await;
        assert_eq!(result, Ok(StepVerdict::Advance));
        assert_eq!(effects[0], SessionEffect::ClearReloads);
        assert!(effects.contains(&SessionEffect::StoreResolution(resolution(
            Some("devfile.yaml"),
            false
        ))));
    }

    #[tokio::test]
    async fn test_known_resolution_skips_resolver() {
        let mut snapshot = ClusterSnapshot::default();
        snapshot
            .resolutions
            .insert(URL.to_string(), resolution(Some("devfile.yaml"), false));
        let ctx = context(
            LoadingStep::CreateWorkspaceFetchDevfile,
            MatchParams::Factory(factory_params()),
            snapshot,
            Arc::new(MockCluster::healthy()),
        );

        let (result, effects) = run(&ctx).await;
        assert_eq!(result, Ok(StepVerdict::Advance));
        assert!(matches!(effects.as_slice(), [SessionEffect::SetTitle(_)]));
    }

    #[tokio::test]
    async fn test_upstream_error_is_verbatim() {
        let ctx = answered(Err(ResolverError::Failed("Not found.".to_string())));
        assert_eq!(
            run(&ctx).await.0,
            Err(LoaderError::Upstream("Not found.".to_string()))
        );
    }

    #[tokio::test]
    async fn test_error_classes() {
        let ctx = answered(Err(ResolverError::Failed(
            "Devfile schema validation failed. Error: /components".to_string(),
        )));
        assert!(matches!(run(&ctx).await.0, Err(LoaderError::InvalidDevfile(_))));

        let ctx = answered(Err(ResolverError::Failed(
            "Failed to fetch devfile".to_string(),
        )));
        assert!(matches!(
            run(&ctx).await.0,
            Err(LoaderError::UnsupportedGitProvider(_))
        ));
    }

    #[tokio::test]
    async fn test_oauth_redirects_once_then_fails() {
        let ctx = answered(Err(ResolverError::OAuthRequired {
            authentication_url: "https://oauth".to_string(),
        }));

        let (result, effects) = run(&ctx).await;
        assert_eq!(
            result,
            Ok(StepVerdict::Redirect {
                authentication_url: "https://oauth".to_string(),
                redirect_url: factory_redirect_url("http://localhost:8080", URL),
            })
        );
        assert_eq!(effects, vec![SessionEffect::RecordReload(URL.to_string())]);

        ctx.collaborators.reloads.increment(URL);
        let (result, _) = run(&ctx).await;
        assert_eq!(result, Err(LoaderError::ReloadLimit));
    }

    #[tokio::test]
    async fn test_default_devfile_skips_fetch() {
        let mut ctx = fetch_ctx();
        ctx.facts.use_default_devfile = true;

        assert_eq!(run(&ctx).await.0, Ok(StepVerdict::Advance));
    }
}
