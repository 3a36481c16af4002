//! Step list construction.
//!
//! A `StepList` is the ordered sequence of steps of one loading flow. It is
//! built from a `FlowKind`, is never reordered, and is rebuilt from scratch
//! on every restart.

mod tree;

pub use tree::to_display_tree;

use wl_protocol::step_models::{FactorySource, FlowKind, LoaderStep, LoadingStep};

/// Canonical step ids of a flow, in order.
pub fn flow_steps(flow: FlowKind) -> &'static [LoadingStep] {
    use LoadingStep::*;

    match flow {
        FlowKind::OpenExisting => &[
            Initialize,
            CheckRunningWorkspacesLimit,
            StartWorkspace,
            OpenWorkspace,
        ],
        FlowKind::ImportFromUrl(FactorySource::Devfile) => &[
            Initialize,
            CheckRunningWorkspacesLimit,
            CreateWorkspace,
            CreateWorkspaceFetchDevfile,
            CreateWorkspaceCheckExistingWorkspaces,
            CreateWorkspaceApplyDevfile,
            StartWorkspace,
            OpenWorkspace,
        ],
        FlowKind::ImportFromUrl(FactorySource::PrebuiltResources) => &[
            Initialize,
            CheckRunningWorkspacesLimit,
            CreateWorkspace,
            CreateWorkspaceFetchResources,
            CreateWorkspaceCheckExistingWorkspaces,
            CreateWorkspaceApplyResources,
            StartWorkspace,
            OpenWorkspace,
        ],
    }
}

/// Builds the step list of a flow. Calling it twice with the same flow
/// yields equal lists.
pub fn build_steps(flow: FlowKind) -> StepList {
    StepList {
        steps: flow_steps(flow).iter().copied().map(LoaderStep::new).collect(),
    }
}

/// An ordered, indexable sequence of loader steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepList {
    steps: Vec<LoaderStep>,
}

impl StepList {
    pub fn get(&self, index: usize) -> Option<&LoaderStep> {
        self.steps.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut LoaderStep> {
        self.steps.get_mut(index)
    }

    pub fn has_next(&self, index: usize) -> bool {
        index + 1 < self.steps.len()
    }

    pub fn position(&self, id: LoadingStep) -> Option<usize> {
        self.steps.iter().position(|step| step.id == id)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_slice(&self) -> &[LoaderStep] {
        &self.steps
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoaderStep> {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_FLOWS: [FlowKind; 3] = [
        FlowKind::OpenExisting,
        FlowKind::ImportFromUrl(FactorySource::Devfile),
        FlowKind::ImportFromUrl(FactorySource::PrebuiltResources),
    ];

    #[test]
    fn test_build_steps_is_idempotent() {
        for flow in ALL_FLOWS {
            assert_eq!(build_steps(flow), build_steps(flow));
        }
    }

    #[test]
    fn test_open_existing_flow() {
        let steps = build_steps(FlowKind::OpenExisting);
        let ids: Vec<_> = steps.iter().map(|s| s.id).collect();

        assert_eq!(
            ids,
            vec![
                LoadingStep::Initialize,
                LoadingStep::CheckRunningWorkspacesLimit,
                LoadingStep::StartWorkspace,
                LoadingStep::OpenWorkspace,
            ]
        );
        assert!(steps.iter().all(|s| s.parent_id.is_none()));
        assert!(steps.has_next(2));
        assert!(!steps.has_next(3));
    }

    #[test]
    fn test_factory_flows_nest_under_create_workspace() {
        let devfile = build_steps(FlowKind::ImportFromUrl(FactorySource::Devfile));
        assert_eq!(devfile.len(), 8);
        assert_eq!(
            devfile.position(LoadingStep::CreateWorkspaceFetchDevfile),
            Some(3)
        );
        assert_eq!(devfile.position(LoadingStep::CreateWorkspaceFetchResources), None);

        let resources = build_steps(FlowKind::ImportFromUrl(FactorySource::PrebuiltResources));
        assert_eq!(resources.len(), 8);
        assert_eq!(
            resources.get(5).map(|s| s.id),
            Some(LoadingStep::CreateWorkspaceApplyResources)
        );

        for steps in [devfile, resources] {
            let children: Vec<_> = steps.iter().filter(|s| s.parent_id.is_some()).collect();
            assert_eq!(children.len(), 3);
            assert!(children
                .iter()
                .all(|s| s.parent_id == Some(LoadingStep::CreateWorkspace)));
        }
    }

    #[test]
    fn test_parents_precede_children() {
        for flow in ALL_FLOWS {
            let steps = build_steps(flow);
            for (index, step) in steps.iter().enumerate() {
                if let Some(parent) = step.parent_id {
                    let parent_index = steps.position(parent).expect("parent is listed");
                    assert!(parent_index < index);
                }
            }
        }
    }

    #[test]
    fn test_fresh_steps_have_no_flags() {
        for flow in ALL_FLOWS {
            let steps = build_steps(flow);
            assert!(steps.iter().all(|s| !s.has_error && !s.has_warning));
            assert!(steps
                .iter()
                .all(|s| s.title == s.id.default_title()));
        }
    }
}
