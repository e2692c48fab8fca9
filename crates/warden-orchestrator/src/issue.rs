//! The issue stage: brief -> drafted issue -> adversarial review -> filed
//! tracker issue.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use warden_audit::AuditDir;
use warden_gate::{GateMode, Interaction};
use warden_llm::LlmBackend;
use warden_phase_api::{Node, NodeContext, NodeOutcome, WorkflowState};
use warden_tracker::TrackerClient;
use warden_utils::error::{AuditError, GovernanceError, GuardError};

use crate::common::{DraftGateNode, DraftNode, ReviewGateNode, ReviewNode, SandboxNode, tracker_error_message};
use crate::handoff;

pub const LOAD_BRIEF: &str = "load-brief";
pub const SANDBOX: &str = "sandbox";
pub const DRAFT: &str = "draft";
pub const HUMAN_EDIT_DRAFT: &str = "human-edit-draft";
pub const REVIEW: &str = "review";
pub const HUMAN_EDIT_VERDICT: &str = "human-edit-verdict";
pub const FILE_ISSUE: &str = "file-issue";

const ISSUE_TEMPLATE: &str = include_str!("../templates/issue_template.md");
const ISSUE_REVIEW_PROMPT: &str = include_str!("../templates/issue_review_prompt.md");

static FIRST_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s").unwrap());
static LABELS_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\*\*Labels:\*\*\s*(.+)$").unwrap());

/// Strips any preamble an LLM emits above the first top-level heading, since
/// only the heading-and-below content is a valid issue body.
pub fn strip_preamble(raw: &str) -> String {
    match FIRST_HEADING.find(raw) {
        Some(m) => raw[m.start()..].to_string(),
        None => raw.to_string(),
    }
}

fn parse_title(body: &str) -> Option<String> {
    body.lines().find(|l| l.starts_with("# ")).map(|l| l.trim_start_matches("# ").trim().to_string())
}

fn parse_labels(body: &str) -> Vec<String> {
    LABELS_LINE
        .captures(body)
        .map(|c| c[1].split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default()
}

pub struct LoadBriefNode {
    pub active_parent: Utf8PathBuf,
}

#[async_trait]
impl Node for LoadBriefNode {
    fn id(&self) -> &'static str {
        LOAD_BRIEF
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let Some(source_path) = state.source_path.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::MissingInput { field: "source_path".into() }));
            return Ok(NodeOutcome::Completed);
        };

        let content = std::fs::read_to_string(source_path.as_std_path()).map_err(GovernanceError::Io)?;

        let audit = match AuditDir::create_active(&self.active_parent, &state.slug) {
            Ok(dir) => dir,
            Err(AuditError::SlugCollision { .. }) => {
                state.error_message = Some("SLUG_COLLISION".to_string());
                return Ok(NodeOutcome::Completed);
            }
            Err(e) => return Err(GovernanceError::Audit(e)),
        };
        audit.save(1, "brief.md", &content).map_err(GovernanceError::Audit)?;

        state.source_text = Some(content);
        state.file_counter = 2;
        state.next_node = Some(SANDBOX.to_string());
        Ok(NodeOutcome::Completed)
    }
}

pub struct FileIssueNode {
    pub active_parent: Utf8PathBuf,
    pub done_parent: Utf8PathBuf,
    pub repo_root: Utf8PathBuf,
    pub tracker: Arc<TrackerClient>,
    pub checkpoint: Arc<warden_checkpoint::CheckpointStore>,
}

#[async_trait]
impl Node for FileIssueNode {
    fn id(&self) -> &'static str {
        FILE_ISSUE
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let Some(body) = state.latest_draft.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::EmptyDraft));
            return Ok(NodeOutcome::Completed);
        };

        let title = parse_title(&body).unwrap_or_else(|| "Untitled issue".to_string());
        let requested_labels = parse_labels(&body);

        if !state.mock_mode && !requested_labels.is_empty() {
            let existing: Vec<String> = match self.tracker.list_labels().await {
                Ok(labels) => labels.into_iter().map(|l| l.name).collect(),
                Err(e) => {
                    state.error_message = Some(tracker_error_message(e));
                    return Ok(NodeOutcome::Completed);
                }
            };
            for label in &requested_labels {
                if !existing.contains(label) {
                    if let Err(e) = self.tracker.create_label(label).await {
                        state.error_message = Some(tracker_error_message(e));
                        return Ok(NodeOutcome::Completed);
                    }
                }
            }
        }

        let (number, url) = if state.mock_mode {
            (1, "https://example.test/issues/1".to_string())
        } else {
            match self.tracker.create_issue(&title, &body, &requested_labels).await {
                Ok(issue) => (issue.number, format!("issue #{}", issue.number)),
                Err(e) => {
                    state.error_message = Some(tracker_error_message(e));
                    return Ok(NodeOutcome::Completed);
                }
            }
        };

        let audit = AuditDir::open(&self.active_parent, &state.slug);
        handoff::finalize(
            &audit,
            &self.done_parent,
            &self.repo_root,
            &self.checkpoint,
            state,
            &number.to_string(),
            "filed.json",
            Some(url),
            Some(title),
            None,
        )
        .map_err(GovernanceError::Audit)?;

        Ok(NodeOutcome::Completed)
    }
}

/// Builds the full issue-stage graph and returns its entry node id.
#[allow(clippy::too_many_arguments)]
pub fn build(
    active_parent: Utf8PathBuf,
    done_parent: Utf8PathBuf,
    repo_root: Utf8PathBuf,
    drafter: Arc<dyn LlmBackend>,
    reviewer: Arc<dyn LlmBackend>,
    model: String,
    timeout_secs: u64,
    max_iterations: u32,
    interaction: Arc<dyn Interaction>,
    gate_mode: GateMode,
    editor_timeout_secs: u64,
    tracker: Arc<TrackerClient>,
    checkpoint: Arc<warden_checkpoint::CheckpointStore>,
    audit: Arc<AuditDir>,
) -> (warden_engine::Graph, &'static str) {
    let nodes: Vec<Arc<dyn Node>> = vec![
        Arc::new(LoadBriefNode { active_parent: active_parent.clone() }),
        Arc::new(SandboxNode {
            node_id: SANDBOX,
            next_node: DRAFT,
            tracker: Some(tracker.clone()),
            editor_configured: std::env::var("EDITOR").is_ok(),
        }),
        Arc::new(DraftNode {
            node_id: DRAFT,
            next_node: HUMAN_EDIT_DRAFT,
            template: ISSUE_TEMPLATE,
            backend: drafter,
            model: model.clone(),
            timeout_secs,
            audit: audit.clone(),
            postprocess: strip_preamble,
            mock_draft: "# Add widget support\n\n**Labels:** enhancement\n\nImplement widget support.".to_string(),
        }),
        Arc::new(DraftGateNode {
            node_id: HUMAN_EDIT_DRAFT,
            mode: gate_mode,
            interaction: interaction.clone(),
            editor_timeout_secs,
            proceed_next: REVIEW,
            revise_next: DRAFT,
        }),
        Arc::new(ReviewNode {
            node_id: REVIEW,
            gate_node: HUMAN_EDIT_VERDICT,
            review_prompt: ISSUE_REVIEW_PROMPT,
            backend: reviewer,
            model,
            timeout_secs,
            max_iterations,
            audit: audit.clone(),
            mock_verdict: "MODEL_IDENTITY: mock-reviewer-pro\n\n[x] **APPROVED**".to_string(),
        }),
        Arc::new(ReviewGateNode {
            node_id: HUMAN_EDIT_VERDICT,
            mode: gate_mode,
            interaction,
            finalize_next: FILE_ISSUE,
            draft_next: DRAFT,
        }),
        Arc::new(FileIssueNode { active_parent, done_parent, repo_root, tracker, checkpoint }),
    ];

    (warden_engine::Graph::new(nodes), LOAD_BRIEF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_preamble_drops_text_above_first_heading() {
        let raw = "Sure, here is the issue:\n\n# Add widget\n\nbody";
        let stripped = strip_preamble(raw);
        assert!(stripped.starts_with("# Add widget"));
    }

    #[test]
    fn parse_title_reads_first_heading() {
        assert_eq!(parse_title("# My Title\n\nbody").as_deref(), Some("My Title"));
    }

    #[test]
    fn parse_labels_splits_comma_list() {
        let labels = parse_labels("# T\n\n**Labels:** enhancement, bug\n");
        assert_eq!(labels, vec!["enhancement".to_string(), "bug".to_string()]);
    }

    #[test]
    fn parse_labels_empty_when_absent() {
        assert!(parse_labels("# T\n\nno labels here").is_empty());
    }
}
