//! Preparation of devfiles and pre-built resources before creation.

use uuid::Uuid;

use wl_protocol::factory_models::{
    CreateRequest, Devfile, DevfileProject, FactoryParams, PoliciesCreate, PrebuiltResources,
    WorkspaceDraft,
};
use wl_protocol::workspace_models::ClusterSnapshot;

/// Devfile attribute carrying the factory source annotation.
pub const SOURCE_ATTRIBUTE: &str = "che.eclipse.org/devfile-source";

const SUFFIX_LEN: usize = 4;

/// Derives a project name from a repository URL: the last path segment
/// without a `.git` extension.
pub fn project_name_from_url(url: &str) -> String {
    let path = url
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let segment = path.rsplit('/').next().unwrap_or_default();
    let name = segment.strip_suffix(".git").unwrap_or(segment);

    if name.is_empty() {
        "project".to_string()
    } else {
        name.to_string()
    }
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SUFFIX_LEN)
        .collect()
}

/// Picks the final workspace name: a random suffix is appended under the
/// `perclick` policy or when the name is already taken in `namespace`.
fn unique_name(base: &str, params: &FactoryParams, namespace: &str, snapshot: &ClusterSnapshot) -> String {
    let taken = snapshot
        .workspaces
        .iter()
        .any(|w| w.namespace == namespace && w.name == base);

    if params.policy() == PoliciesCreate::Perclick || taken {
        format!("{}-{}", base.trim_end_matches('-'), random_suffix())
    } else {
        base.to_string()
    }
}

/// Prepares a resolved (or default) devfile for creation.
pub fn prepare_devfile(
    devfile: &Devfile,
    params: &FactoryParams,
    namespace: &str,
    snapshot: &ClusterSnapshot,
    use_default: bool,
) -> WorkspaceDraft {
    let mut devfile = devfile.clone();

    if use_default && devfile.projects.is_empty() && !params.source_url.is_empty() {
        let name = project_name_from_url(&params.source_url);
        devfile.projects.push(DevfileProject {
            name: name.clone(),
            git_remote: Some(params.source_url.clone()),
        });
        devfile.metadata.generate_name = Some(format!("{name}-"));
        devfile.metadata.name = name;
    }

    let base = if !devfile.metadata.name.is_empty() {
        devfile.metadata.name.clone()
    } else if let Some(generate_name) = &devfile.metadata.generate_name {
        generate_name.trim_end_matches('-').to_string()
    } else {
        project_name_from_url(&params.source_url)
    };

    let name = unique_name(&base, params, namespace, snapshot);
    devfile.metadata.name = name.clone();

    let source = params.source_annotation();
    devfile
        .attributes
        .insert(SOURCE_ATTRIBUTE.to_string(), source.clone());

    WorkspaceDraft {
        name,
        source,
        request: CreateRequest::Devfile(devfile),
    }
}

/// Prepares pre-built resources for creation. Returns `None` when the
/// resources do not contain a workspace.
pub fn prepare_resources(
    resources: &PrebuiltResources,
    params: &FactoryParams,
    namespace: &str,
    snapshot: &ClusterSnapshot,
) -> Option<WorkspaceDraft> {
    let base = resources.workspace_name()?;
    let name = unique_name(base, params, namespace, snapshot);

    let mut resources = resources.clone();
    if let Some(workspace) = resources.resources.first_mut() {
        workspace.name = name.clone();
    }

    Some(WorkspaceDraft {
        name,
        source: params.source_annotation(),
        request: CreateRequest::Resources(resources),
    })
}
