//! Display tree of a step list.

use std::cmp::Ordering;

use wl_protocol::step_models::{LoaderStep, StepDisplayStatus, StepNode};

/// Builds the nested structure the view layer renders.
///
/// Steps before `current_index` are done, the step at `current_index` is in
/// progress and later steps are pending; error and warning flags override
/// done and in progress. A grouping step takes the most severe status of its
/// children.
pub fn to_display_tree(current_index: usize, steps: &[LoaderStep]) -> Vec<StepNode> {
    let mut roots: Vec<StepNode> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        let node = StepNode {
            id: step.id,
            title: step.title.clone(),
            status: own_status(index, current_index, step),
            children: Vec::new(),
        };

        let parent = step
            .parent_id
            .and_then(|parent_id| roots.iter_mut().find(|root| root.id == parent_id));

        match parent {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }

    for root in roots.iter_mut().filter(|root| !root.children.is_empty()) {
        root.status = group_status(root.status, &root.children);
    }

    roots
}

fn own_status(index: usize, current_index: usize, step: &LoaderStep) -> StepDisplayStatus {
    if index > current_index {
        return StepDisplayStatus::Pending;
    }
    if step.has_error {
        return StepDisplayStatus::Failed;
    }
    if step.has_warning {
        return StepDisplayStatus::Warning;
    }
    match index.cmp(&current_index) {
        Ordering::Less => StepDisplayStatus::Done,
        _ => StepDisplayStatus::InProgress,
    }
}

fn group_status(own: StepDisplayStatus, children: &[StepNode]) -> StepDisplayStatus {
    let any = |status| children.iter().any(|child| child.status == status);

    if any(StepDisplayStatus::Failed) {
        StepDisplayStatus::Failed
    } else if any(StepDisplayStatus::Warning) {
        StepDisplayStatus::Warning
    } else if any(StepDisplayStatus::InProgress) {
        StepDisplayStatus::InProgress
    } else if children
        .iter()
        .all(|child| child.status == StepDisplayStatus::Done)
    {
        StepDisplayStatus::Done
    } else if own == StepDisplayStatus::Pending {
        StepDisplayStatus::Pending
    } else {
        // the group itself is active but no child has started yet
        StepDisplayStatus::InProgress
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::build_steps;
    use wl_protocol::step_models::{FactorySource, FlowKind, LoadingStep};

    fn statuses(nodes: &[StepNode]) -> Vec<StepDisplayStatus> {
        nodes.iter().map(|n| n.status).collect()
    }

    #[test]
    fn test_flat_tree() {
        let steps = build_steps(FlowKind::OpenExisting);
        let tree = to_display_tree(2, steps.as_slice());

        assert_eq!(
            statuses(&tree),
            vec![
                StepDisplayStatus::Done,
                StepDisplayStatus::Done,
                StepDisplayStatus::InProgress,
                StepDisplayStatus::Pending,
            ]
        );
        assert!(tree.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_error_and_warning_override() {
        let mut steps = build_steps(FlowKind::OpenExisting);
        if let Some(step) = steps.get_mut(1) {
            step.has_warning = true;
        }
        if let Some(step) = steps.get_mut(2) {
            step.has_error = true;
        }

        let tree = to_display_tree(2, steps.as_slice());
        assert_eq!(tree[1].status, StepDisplayStatus::Warning);
        assert_eq!(tree[2].status, StepDisplayStatus::Failed);
    }

    #[test]
    fn test_group_status_follows_children() {
        let steps = build_steps(FlowKind::ImportFromUrl(FactorySource::Devfile));

        let tree = to_display_tree(1, steps.as_slice());
        assert_eq!(tree.len(), 5);
        let group = &tree[2];
        assert_eq!(group.id, LoadingStep::CreateWorkspace);
        assert_eq!(group.children.len(), 3);
        assert_eq!(group.status, StepDisplayStatus::Pending);

        // first child is current
        let tree = to_display_tree(3, steps.as_slice());
        assert_eq!(tree[2].status, StepDisplayStatus::InProgress);
        assert_eq!(tree[2].children[0].status, StepDisplayStatus::InProgress);

        // all children done
        let tree = to_display_tree(6, steps.as_slice());
        assert_eq!(tree[2].status, StepDisplayStatus::Done);
        assert_eq!(tree[3].status, StepDisplayStatus::InProgress);
    }

    #[test]
    fn test_group_fails_with_child() {
        let mut steps = build_steps(FlowKind::ImportFromUrl(FactorySource::PrebuiltResources));
        if let Some(step) = steps.get_mut(3) {
            step.has_error = true;
        }

        let tree = to_display_tree(3, steps.as_slice());
        assert_eq!(tree[2].status, StepDisplayStatus::Failed);
        assert_eq!(tree[2].children[0].status, StepDisplayStatus::Failed);
        assert_eq!(tree[2].children[1].status, StepDisplayStatus::Pending);
    }
}
