//! The low-level design stage: a filed issue -> drafted LLD -> adversarial
//! review -> an approved design document.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::sync::Arc;
use warden_audit::AuditDir;
use warden_gate::{GateMode, Interaction};
use warden_llm::LlmBackend;
use warden_phase_api::{Node, NodeContext, NodeOutcome, WorkflowState};
use warden_tracker::TrackerClient;
use warden_utils::atomic_write::write_file_atomic;
use warden_utils::error::{AuditError, GovernanceError, GuardError};

use crate::common::{DraftGateNode, DraftNode, ReviewGateNode, ReviewNode, SandboxNode, tracker_error_message};
use crate::handoff;

pub const LOAD_ISSUE: &str = "load-issue";
pub const SANDBOX: &str = "sandbox";
pub const DRAFT: &str = "draft";
pub const HUMAN_EDIT_DRAFT: &str = "human-edit-draft";
pub const REVIEW: &str = "review";
pub const HUMAN_EDIT_VERDICT: &str = "human-edit-verdict";
pub const FINALIZE: &str = "finalize";

const LLD_TEMPLATE: &str = include_str!("../templates/lld_template.md");
const LLD_REVIEW_PROMPT: &str = include_str!("../templates/lld_review_prompt.md");

fn passthrough(raw: &str) -> String {
    raw.to_string()
}

pub struct LoadIssueNode {
    pub active_parent: Utf8PathBuf,
    pub tracker: Arc<TrackerClient>,
    pub issue_number: u64,
}

#[async_trait]
impl Node for LoadIssueNode {
    fn id(&self) -> &'static str {
        LOAD_ISSUE
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let (title, body) = if state.mock_mode {
            ("Add widget support".to_string(), "Implement widget support across the service.".to_string())
        } else {
            match self.tracker.fetch_issue(self.issue_number).await {
                Ok(issue) => (issue.title, issue.body),
                Err(e) => {
                    state.error_message = Some(tracker_error_message(e));
                    return Ok(NodeOutcome::Completed);
                }
            }
        };

        let audit = match AuditDir::create_active(&self.active_parent, &state.slug) {
            Ok(dir) => dir,
            Err(AuditError::SlugCollision { .. }) => {
                state.error_message = Some("SLUG_COLLISION".to_string());
                return Ok(NodeOutcome::Completed);
            }
            Err(e) => return Err(GovernanceError::Audit(e)),
        };

        let combined = format!("# {title}\n\n{body}");
        audit.save(1, "issue.md", &combined).map_err(GovernanceError::Audit)?;

        state.external_id = Some(self.issue_number.to_string());
        state.source_text = Some(combined);
        state.file_counter = 2;
        state.next_node = Some(SANDBOX.to_string());
        Ok(NodeOutcome::Completed)
    }
}

pub struct LldFinalizeNode {
    pub active_parent: Utf8PathBuf,
    pub done_parent: Utf8PathBuf,
    pub repo_root: Utf8PathBuf,
    pub lld_active_dir: Utf8PathBuf,
    pub checkpoint: Arc<warden_checkpoint::CheckpointStore>,
}

#[async_trait]
impl Node for LldFinalizeNode {
    fn id(&self) -> &'static str {
        FINALIZE
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let Some(body) = state.latest_draft.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::EmptyDraft));
            return Ok(NodeOutcome::Completed);
        };
        let Some(issue_id) = state.external_id.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::MissingInput { field: "external_id".into() }));
            return Ok(NodeOutcome::Completed);
        };

        let lld_path = self.lld_active_dir.join(format!("LLD-{issue_id}.md"));
        write_file_atomic(&lld_path, &body).map_err(GovernanceError::Io)?;

        let audit = AuditDir::open(&self.active_parent, &state.slug);
        handoff::finalize(
            &audit,
            &self.done_parent,
            &self.repo_root,
            &self.checkpoint,
            state,
            &issue_id,
            "approved.json",
            None,
            None,
            Some(lld_path),
        )
        .map_err(GovernanceError::Audit)?;

        Ok(NodeOutcome::Completed)
    }
}

/// Builds the full LLD-stage graph and returns its entry node id.
#[allow(clippy::too_many_arguments)]
pub fn build(
    active_parent: Utf8PathBuf,
    done_parent: Utf8PathBuf,
    repo_root: Utf8PathBuf,
    lld_active_dir: Utf8PathBuf,
    issue_number: u64,
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
        Arc::new(LoadIssueNode { active_parent: active_parent.clone(), tracker: tracker.clone(), issue_number }),
        Arc::new(SandboxNode {
            node_id: SANDBOX,
            next_node: DRAFT,
            tracker: Some(tracker),
            editor_configured: std::env::var("EDITOR").is_ok(),
        }),
        Arc::new(DraftNode {
            node_id: DRAFT,
            next_node: HUMAN_EDIT_DRAFT,
            template: LLD_TEMPLATE,
            backend: drafter,
            model: model.clone(),
            timeout_secs,
            audit: audit.clone(),
            postprocess: passthrough,
            mock_draft: "# LLD: Widget support\n\n## Design\n\nAdd a Widget trait.\n".to_string(),
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
            review_prompt: LLD_REVIEW_PROMPT,
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
            finalize_next: FINALIZE,
            draft_next: DRAFT,
        }),
        Arc::new(LldFinalizeNode { active_parent, done_parent, repo_root, lld_active_dir, checkpoint }),
    ];

    (warden_engine::Graph::new(nodes), LOAD_ISSUE)
}
