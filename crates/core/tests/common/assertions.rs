//! Custom assertion helpers for loader integration tests.

#![allow(dead_code)]

use wl_core::collaborators::mock::{MockCall, MockCluster};
use wl_protocol::ipc::{Event, LoaderView};
use wl_protocol::step_models::LoadingStep;

/// The URL of the first navigation event, if any.
pub fn navigated_to(events: &[Event]) -> Option<&str> {
    events.iter().find_map(|event| match event {
        Event::Navigate { url } => Some(url.as_str()),
        _ => None,
    })
}

/// Bodies of every alert raised, in order, without repeats of the same
/// alert across consecutive progress updates.
pub fn alert_bodies(events: &[Event]) -> Vec<String> {
    let mut bodies = Vec::new();
    let mut previous: Option<&str> = None;

    for event in events {
        let Event::Progress(view) = event else {
            continue;
        };
        let body = view.alert.as_ref().map(|alert| alert.body.as_str());
        if let Some(body) = body {
            if previous != Some(body) {
                bodies.push(body.to_string());
            }
        }
        previous = body;
    }
    bodies
}

pub fn current_step(view: &LoaderView) -> LoadingStep {
    view.steps[view.current_step_index].id
}

/// Assert that the step index never decreases across `views`.
pub fn assert_monotonic(views: &[&LoaderView]) {
    for pair in views.windows(2) {
        assert!(
            pair[1].current_step_index >= pair[0].current_step_index,
            "Step index went back from {} to {}",
            pair[0].current_step_index,
            pair[1].current_step_index
        );
    }
}

pub fn start_calls(mock: &MockCluster) -> usize {
    mock.count(|call| matches!(call, MockCall::StartWorkspace(_)))
}

pub fn create_calls(mock: &MockCluster) -> Vec<String> {
    mock.calls()
        .into_iter()
        .filter_map(|call| match call {
            MockCall::CreateWorkspace { name, .. } => Some(name),
            _ => None,
        })
        .collect()
}
