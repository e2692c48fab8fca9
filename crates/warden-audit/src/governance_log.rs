//! The governance log: an append-only JSONL of workflow-level events, kept
//! per repository. Advisory only — the engine never reads it back to decide
//! resume behavior, so a lost or truncated log cannot desynchronize a
//! running workflow.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::io::Write;
use warden_utils::error::AuditError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: String,
    pub stage: String,
    pub external_id: Option<String>,
    pub kind: String,
    pub details: Option<serde_json::Value>,
}

impl LogEvent {
    #[must_use]
    pub fn new(timestamp: impl Into<String>, stage: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { timestamp: timestamp.into(), stage: stage.into(), external_id: None, kind: kind.into(), details: None }
    }

    #[must_use]
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub struct GovernanceLog {
    path: std::path::PathBuf,
}

impl GovernanceLog {
    #[must_use]
    pub fn at(repo_root: &Utf8Path) -> Self {
        Self { path: repo_root.join("docs/lineage/workflow-audit.jsonl").into_std_path_buf() }
    }

    /// Appends one JSON line. Opens in append mode so concurrent writers
    /// from separate workflow instances interleave safely at the OS level
    /// for writes under `PIPE_BUF`.
    pub fn append(&self, event: &LogEvent) -> Result<(), AuditError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        let line = serde_json::to_string(event).map_err(|e| AuditError::WriteFailed {
            number: 0,
            suffix: "workflow-audit.jsonl".into(),
            reason: e.to_string(),
        })?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Reads back all events, for tooling and tests; never used by the
    /// engine itself.
    pub fn read_all(&self) -> Result<Vec<LogEvent>, AuditError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let mut events = Vec::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            let event: LogEvent = serde_json::from_str(line).map_err(|e| AuditError::WriteFailed {
                number: 0,
                suffix: "workflow-audit.jsonl".into(),
                reason: e.to_string(),
            })?;
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn append_then_read_all_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let log = GovernanceLog::at(&root);

        log.append(&LogEvent::new("t1", "lld", "workflow_started")).unwrap();
        log.append(&LogEvent::new("t2", "lld", "workflow_finalized").with_external_id("42")).unwrap();

        let events = log.read_all().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "workflow_started");
        assert_eq!(events[1].external_id.as_deref(), Some("42"));
    }

    #[test]
    fn reading_nonexistent_log_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let log = GovernanceLog::at(&root);
        assert!(log.read_all().unwrap().is_empty());
    }
}
