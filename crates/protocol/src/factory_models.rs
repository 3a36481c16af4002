//! Factory flow models.
//!
//! A factory is a URL pointing either at a repository/devfile or at a file of
//! pre-built DevWorkspace resources. These models carry the factory
//! parameters and the results of resolving them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use ts_rs::TS;

use crate::step_models::FactorySource;

/// Workspace creation policy requested by the factory URL.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "lowercase")]
pub enum PoliciesCreate {
    /// Reuse the workspace created from the same source, if any.
    #[default]
    Peruser,
    /// Always create a new workspace.
    Perclick,
}

impl PoliciesCreate {
    /// Parses the `policies.create` parameter. Returns `None` for
    /// unsupported values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "peruser" => Some(Self::Peruser),
            "perclick" => Some(Self::Perclick),
            _ => None,
        }
    }
}

impl fmt::Display for PoliciesCreate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Peruser => f.write_str("peruser"),
            Self::Perclick => f.write_str("perclick"),
        }
    }
}

/// Parameters of a factory (import from URL) loading attempt.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct FactoryParams {
    /// Repository, devfile or resources URL. May be empty, which is rejected
    /// during initialization.
    #[serde(default)]
    pub source_url: String,

    #[serde(default)]
    pub use_devworkspace_resources: bool,

    /// Raw `policies.create` value. Kept as a string so unsupported values
    /// can be reported.
    #[serde(default = "default_policies_create")]
    pub policies_create: String,

    /// Error code forwarded by the OAuth callback.
    #[serde(default)]
    pub error_code: Option<String>,

    /// Stable id of this factory, used for the source annotation.
    #[serde(default)]
    pub factory_id: Option<String>,
}

fn default_policies_create() -> String {
    PoliciesCreate::default().to_string()
}

impl Default for FactoryParams {
    fn default() -> Self {
        Self {
            source_url: String::new(),
            use_devworkspace_resources: false,
            policies_create: default_policies_create(),
            error_code: None,
            factory_id: None,
        }
    }
}

impl FactoryParams {
    pub fn source(&self) -> FactorySource {
        if self.use_devworkspace_resources {
            FactorySource::PrebuiltResources
        } else {
            FactorySource::Devfile
        }
    }

    /// The supported creation policy; unsupported values fall back to the
    /// default.
    pub fn policy(&self) -> PoliciesCreate {
        PoliciesCreate::parse(&self.policies_create).unwrap_or_default()
    }

    /// Value stamped into the source annotation of created workspaces.
    pub fn source_annotation(&self) -> String {
        self.factory_id
            .clone()
            .unwrap_or_else(|| format!("url={}", self.source_url))
    }
}

/// Metadata block of a devfile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "camelCase")]
pub struct DevfileMetadata {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generate_name: Option<String>,
}

/// A project entry of a devfile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct DevfileProject {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_remote: Option<String>,
}

/// The parts of a devfile the loader reads or rewrites.
///
/// Everything else in the document is opaque to the loader.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct Devfile {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    #[serde(default)]
    pub metadata: DevfileMetadata,

    #[serde(default)]
    pub projects: Vec<DevfileProject>,

    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

fn default_schema_version() -> String {
    "2.2.0".to_string()
}

impl Default for Devfile {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            metadata: DevfileMetadata::default(),
            projects: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }
}

/// Result of resolving a factory URL to a devfile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct FactoryResolution {
    /// The URL the resolver was asked about.
    pub location: String,

    /// Path of the devfile inside the repository, e.g. `devfile.yaml`.
    /// `None` when no devfile was found and a default one was generated.
    #[serde(default)]
    pub source: Option<String>,

    pub devfile: Devfile,

    /// True when a version 1 devfile was converted to version 2.
    #[serde(default)]
    pub converted: bool,
}

/// One pre-built DevWorkspace resource.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltResource {
    pub kind: String,
    pub name: String,
}

/// Pre-built resources fetched from a resources URL.
///
/// The first resource is the DevWorkspace itself, which names the workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "camelCase")]
pub struct PrebuiltResources {
    #[serde(default)]
    pub resources: Vec<PrebuiltResource>,
}

impl PrebuiltResources {
    pub fn workspace_name(&self) -> Option<&str> {
        self.resources.first().map(|r| r.name.as_str())
    }
}

/// What the apply steps hand to the cluster client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CreateRequest {
    Devfile(Devfile),
    Resources(PrebuiltResources),
}

/// A workspace about to be created, already prepared for the target
/// namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceDraft {
    pub name: String,

    /// Value of the factory source annotation.
    pub source: String,

    pub request: CreateRequest,
}
