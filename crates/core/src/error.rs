//! Loader failure taxonomy and collaborator errors.
//!
//! Every terminal outcome of a step is a `LoaderError`. Its `Display` output
//! is the exact text shown in the alert body, so upstream messages are kept
//! verbatim.

use thiserror::Error;
use wl_protocol::workspace_models::{WorkspaceParams, WorkspaceStatus};

/// Error returned by the cluster client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    Request(String),
}

/// Error returned by the factory resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("{0}")]
    Failed(String),

    /// The repository is private; the user has to authenticate with the git
    /// provider first.
    #[error("Authentication is required to resolve the devfile.")]
    OAuthRequired { authentication_url: String },
}

/// Broad class of a `LoaderError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Timeout,
    UnexpectedTransition,
    Upstream,
    /// A recoverable failure the user can act on without restarting.
    Warning,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoaderError {
    #[error("Workspace \"{0}\" not found.")]
    WorkspaceNotFound(WorkspaceParams),

    #[error("The workspace status remains \"{status}\" in the last {seconds} seconds.")]
    StatusTimeout {
        status: WorkspaceStatus,
        seconds: u64,
    },

    #[error("The workspace has not received an IDE URL in the last {seconds} seconds. Try to re-open the workspace.")]
    UrlTimeout { seconds: u64 },

    #[error("Devfile hasn't been resolved in the last {seconds} seconds.")]
    ResolveTimeout { seconds: u64 },

    #[error("Pre-built resources haven't been fetched in the last {seconds} seconds.")]
    FetchTimeout { seconds: u64 },

    #[error("Workspace hasn't been created in the last {seconds} seconds.")]
    CreateTimeout { seconds: u64 },

    /// `reason` is the most specific error reported for the workspace, if
    /// any; it replaces the generic text.
    #[error("{}", unexpected_transition(.status, .reason))]
    UnexpectedTransition {
        status: WorkspaceStatus,
        reason: Option<String>,
    },

    /// Message of a failed collaborator call or a rejected precondition.
    #[error("{0}")]
    Upstream(String),

    #[error("The Dashboard reached a limit of reloads while trying to resolve a devfile in a private repo. Please contact admin to check if OAuth is configured correctly.")]
    ReloadLimit,

    /// The resolved devfile does not pass schema validation.
    #[error("{0}")]
    InvalidDevfile(String),

    #[error("{0}")]
    UnsupportedGitProvider(String),

    /// Creating the workspace from the devfile failed.
    #[error("{0}")]
    CreateWorkspace(String),

    #[error("A workspace with the same name ({}) has been found. Should you want to open the existing workspace or proceed to create a new one, please choose the corresponding action.", workspace_name(.existing))]
    NameConflict { existing: WorkspaceParams },

    #[error("You can only have {limit} running workspace{} at a time.", plural(.limit))]
    RunningLimit {
        limit: u32,
        running: Vec<WorkspaceParams>,
    },
}

fn unexpected_transition(status: &WorkspaceStatus, reason: &Option<String>) -> String {
    match reason {
        Some(reason) => reason.clone(),
        None => format!("The workspace status changed unexpectedly to \"{status}\"."),
    }
}

fn workspace_name(params: &WorkspaceParams) -> &str {
    &params.workspace_name
}

fn plural(count: &u32) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

impl LoaderError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::WorkspaceNotFound(_) => FailureKind::NotFound,
            Self::StatusTimeout { .. }
            | Self::UrlTimeout { .. }
            | Self::ResolveTimeout { .. }
            | Self::FetchTimeout { .. }
            | Self::CreateTimeout { .. } => FailureKind::Timeout,
            Self::UnexpectedTransition { .. } => FailureKind::UnexpectedTransition,
            Self::Upstream(_) | Self::ReloadLimit => FailureKind::Upstream,
            Self::InvalidDevfile(_)
            | Self::UnsupportedGitProvider(_)
            | Self::CreateWorkspace(_)
            | Self::NameConflict { .. }
            | Self::RunningLimit { .. } => FailureKind::Warning,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }
}

impl From<ClientError> for LoaderError {
    fn from(err: ClientError) -> Self {
        Self::Upstream(err.to_string())
    }
}
