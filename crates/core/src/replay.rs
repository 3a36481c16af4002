//! Scenario replay.
//!
//! Drives a controller with the timeline of a [`Scenario`], serving every
//! collaborator from the scenario's scripted replies, and collects what the
//! controller emitted.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use crate::collaborators::mock::{MockCall, MockCluster};
use crate::collaborators::Collaborators;
use crate::loader::{spawn_loader, LoaderOptions};
use wl_protocol::ipc::{Event, Op};
use wl_protocol::scenario_models::{Scenario, ScenarioEvent};

/// Everything a replayed scenario produced.
#[derive(Debug, Clone)]
pub struct ReplayReport {
    pub scenario: String,
    pub events: Vec<Event>,
    pub calls: Vec<MockCall>,
}

impl ReplayReport {
    /// The URL the loader navigated to, if it got that far.
    pub fn navigated_to(&self) -> Option<&str> {
        self.events.iter().find_map(|event| match event {
            Event::Navigate { url } => Some(url.as_str()),
            _ => None,
        })
    }

    /// The alert of the last progress update, if any.
    pub fn final_alert(&self) -> Option<&wl_protocol::alert_models::AlertItem> {
        self.events
            .iter()
            .rev()
            .find_map(|event| match event {
                Event::Progress(view) => Some(view),
                _ => None,
            })
            .and_then(|view| view.alert.as_ref())
    }
}

fn to_op(event: &ScenarioEvent) -> Op {
    match event {
        ScenarioEvent::Snapshot(snapshot) => Op::UpdateSnapshot(snapshot.clone()),
        ScenarioEvent::Log {
            workspace_id,
            message,
        } => Op::AppendLog {
            workspace_id: workspace_id.clone(),
            message: message.clone(),
        },
        ScenarioEvent::Action(action) => Op::Action(action.clone()),
        ScenarioEvent::Restart { tab } => Op::Restart { tab: *tab },
    }
}

async fn send(ops: &mpsc::Sender<Op>, op: Op) -> Result<()> {
    ops.send(op)
        .await
        .map_err(|_| anyhow::anyhow!("loader controller stopped unexpectedly"))
}

/// Replays `scenario` and returns the emitted events and collaborator calls.
pub async fn replay(scenario: &Scenario, options: LoaderOptions) -> Result<ReplayReport> {
    let mock = Arc::new(MockCluster::new(scenario.replies.clone()));
    let handle = spawn_loader(
        scenario.target.clone(),
        options,
        Collaborators::from_shared(mock.clone()),
    );

    let mut events_rx = handle.events;
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = events_rx.recv().await {
            events.push(event);
        }
        events
    });

    send(&handle.ops, Op::Start).await?;
    for entry in &scenario.timeline {
        tokio::time::sleep(Duration::from_millis(entry.after_ms)).await;
        debug!(event = ?entry.event, "replaying");
        send(&handle.ops, to_op(&entry.event)).await?;
    }

    tokio::time::sleep(Duration::from_millis(scenario.settle_ms)).await;
    send(&handle.ops, Op::Shutdown).await?;

    handle
        .task
        .await
        .context("loader controller panicked")?;
    let events = collector.await.context("event collector panicked")?;

    Ok(ReplayReport {
        scenario: scenario.name.clone(),
        events,
        calls: mock.calls(),
    })
}
