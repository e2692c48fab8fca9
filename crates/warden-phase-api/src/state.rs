//! The open workflow state record. Fields are grouped by the partitions
//! described for the data model: input, tracking, current artifacts,
//! cumulative history, routing, outputs, error, and mode. Every field is
//! optional except the ones set once at creation, so a node's delta can
//! touch only what it changed.

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// One recorded reviewer verdict, retained forever in cumulative history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub iteration: u32,
    pub approved: bool,
    pub raw_text: String,
    pub model_identity_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    // --- input (set once) ---
    pub stage: String,
    pub external_id: Option<String>,
    pub slug: String,
    pub source_path: Option<Utf8PathBuf>,
    pub source_text: Option<String>,
    pub repo_root: Option<Utf8PathBuf>,
    pub context_files: Vec<Utf8PathBuf>,

    // --- tracking ---
    pub file_counter: u32,
    pub iteration_count: u32,
    pub draft_count: u32,
    pub verdict_count: u32,

    // --- current artifacts ---
    pub latest_draft: Option<String>,
    pub latest_draft_path: Option<Utf8PathBuf>,
    pub latest_verdict: Option<String>,
    pub latest_feedback: Option<String>,

    // --- cumulative history ---
    pub verdict_history: Vec<Verdict>,

    // --- routing ---
    pub next_node: Option<String>,

    // --- outputs ---
    pub final_external_id: Option<String>,
    pub final_url: Option<String>,
    pub final_artifact_path: Option<Utf8PathBuf>,

    // --- error ---
    pub error_message: Option<String>,

    // --- mode (set once) ---
    pub auto_mode: bool,
    pub mock_mode: bool,
    pub dry_run: bool,
}

impl WorkflowState {
    #[must_use]
    pub fn new(stage: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            external_id: None,
            slug: slug.into(),
            source_path: None,
            source_text: None,
            repo_root: None,
            context_files: Vec::new(),
            file_counter: 1,
            iteration_count: 0,
            draft_count: 0,
            verdict_count: 0,
            latest_draft: None,
            latest_draft_path: None,
            latest_verdict: None,
            latest_feedback: None,
            verdict_history: Vec::new(),
            next_node: None,
            final_external_id: None,
            final_url: None,
            final_artifact_path: None,
            error_message: None,
            auto_mode: false,
            mock_mode: false,
            dry_run: false,
        }
    }

    /// The thread id used to key the checkpoint store: `<external_id>-<stage>`,
    /// falling back to the slug when there is no external id yet (the issue
    /// stage, before filing).
    #[must_use]
    pub fn thread_id(&self) -> String {
        match &self.external_id {
            Some(id) => format!("{id}-{}", self.stage),
            None => format!("{}-{}", self.slug, self.stage),
        }
    }

    pub fn push_verdict(&mut self, verdict: Verdict) {
        self.verdict_count += 1;
        self.verdict_history.push(verdict);
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.verdict_history.last().is_some_and(|v| v.approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_id_uses_external_id_when_present() {
        let mut s = WorkflowState::new("lld", "widget");
        s.external_id = Some("42".into());
        assert_eq!(s.thread_id(), "42-lld");
    }

    #[test]
    fn thread_id_falls_back_to_slug() {
        let s = WorkflowState::new("issue", "widget");
        assert_eq!(s.thread_id(), "widget-issue");
    }

    #[test]
    fn push_verdict_keeps_count_and_history_in_sync() {
        let mut s = WorkflowState::new("lld", "widget");
        s.push_verdict(Verdict { iteration: 1, approved: false, raw_text: "nope".into(), model_identity_warning: None });
        s.push_verdict(Verdict { iteration: 2, approved: true, raw_text: "[x] **APPROVED**".into(), model_identity_warning: None });
        assert_eq!(s.verdict_count, 2);
        assert_eq!(s.verdict_history.len(), 2);
        assert!(s.is_approved());
    }
}
