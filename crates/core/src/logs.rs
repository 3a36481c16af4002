//! Per-workspace log aggregation.
//!
//! `WorkspaceLogs` accumulates status messages and streamed log lines keyed
//! by workspace id. Runners query it for the most specific failure reason
//! when a workspace fails.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use wl_protocol::workspace_models::{WorkspaceSnapshot, WorkspaceStatus};

#[allow(clippy::expect_used)]
static ERROR_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+ errors? occurred:\s*|^Error:\s*").expect("error marker pattern is valid")
});

/// Prefix added to status messages of failed workspaces.
pub const FAILURE_PREFIX: &str = "1 error occurred: ";

/// Ordered log lines per workspace, owned by one loader session.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceLogs {
    entries: HashMap<String, Vec<String>>,
}

impl WorkspaceLogs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `message` unless it equals the previous message for the same
    /// workspace.
    ///
    /// Returns true if the message was recorded.
    pub fn append(&mut self, workspace_id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        let lines = self.entries.entry(workspace_id.to_string()).or_default();

        if lines.last() == Some(&message) {
            return false;
        }

        lines.push(message);
        true
    }

    /// Records the status message of a workspace snapshot.
    ///
    /// Messages of failed workspaces get an error marker so that they can be
    /// extracted later. Messages of stopped workspaces are not recorded.
    /// Returns the recorded line, if any.
    pub fn record_status(&mut self, workspace: &WorkspaceSnapshot) -> Option<String> {
        let message = workspace.message.as_deref()?;
        if message.is_empty() {
            return None;
        }

        let line = match workspace.status {
            WorkspaceStatus::Stopped => return None,
            WorkspaceStatus::Failed | WorkspaceStatus::Failing => {
                format!("{FAILURE_PREFIX}{message}")
            }
            _ => message.to_string(),
        };

        let key = workspace.log_key();
        self.append(&key, line.clone()).then_some(line)
    }

    pub fn lines(&self, workspace_id: &str) -> &[String] {
        self.entries
            .get(workspace_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the lines carrying an error marker, with the marker removed,
    /// in original order.
    pub fn error_lines(&self, workspace_id: &str) -> Vec<String> {
        self.lines(workspace_id)
            .iter()
            .filter(|line| ERROR_MARKER.is_match(line))
            .map(|line| ERROR_MARKER.replace(line, "").into_owned())
            .collect()
    }

    pub fn clear(&mut self, workspace_id: &str) {
        self.entries.remove(workspace_id);
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_skips_repeated_message() {
        let mut logs = WorkspaceLogs::new();

        assert!(logs.append("uid-1", "Stopping"));
        assert!(!logs.append("uid-1", "Stopping"));
        assert!(logs.append("uid-1", "Stopped"));
        assert!(logs.append("uid-1", "Stopping"));
        assert!(logs.append("uid-2", "Stopping"));

        assert_eq!(logs.lines("uid-1"), ["Stopping", "Stopped", "Stopping"]);
        assert_eq!(logs.lines("uid-2"), ["Stopping"]);
        assert!(logs.lines("unknown").is_empty());
    }

    #[test]
    fn test_error_lines_strip_marker() {
        let mut logs = WorkspaceLogs::new();
        logs.append("uid-1", "Pulling image");
        logs.append("uid-1", "1 error occurred: Container tooling failed");
        logs.append("uid-1", "Error: PVC is not bound");
        logs.append("uid-1", "3 errors occurred:  quota exceeded");
        logs.append("uid-1", "Not an Error: here");

        assert_eq!(
            logs.error_lines("uid-1"),
            vec![
                "Container tooling failed".to_string(),
                "PVC is not bound".to_string(),
                "quota exceeded".to_string(),
            ]
        );
    }

    #[test]
    fn test_record_status() {
        let mut logs = WorkspaceLogs::new();
        let mut workspace = WorkspaceSnapshot::new("ns", "wksp", WorkspaceStatus::Failed);
        workspace.uid = Some("uid-1".to_string());
        workspace.message = Some("Container tooling failed".to_string());

        assert_eq!(
            logs.record_status(&workspace).as_deref(),
            Some("1 error occurred: Container tooling failed")
        );
        assert_eq!(logs.record_status(&workspace), None);

        workspace.status = WorkspaceStatus::Stopped;
        workspace.message = Some("Stopped".to_string());
        assert_eq!(logs.record_status(&workspace), None);

        assert_eq!(logs.error_lines("uid-1"), vec!["Container tooling failed"]);
    }

    #[test]
    fn test_clear() {
        let mut logs = WorkspaceLogs::new();
        logs.append("uid-1", "Error: boom");
        logs.append("uid-2", "Error: bang");

        logs.clear("uid-1");
        assert!(logs.lines("uid-1").is_empty());
        assert_eq!(logs.error_lines("uid-2"), vec!["bang"]);

        logs.clear_all();
        assert!(logs.lines("uid-2").is_empty());
    }
}
