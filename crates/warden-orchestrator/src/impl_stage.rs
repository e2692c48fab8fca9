//! The implementation stage: an approved LLD -> test-first code -> a real
//! test run whose exit code is authoritative -> adversarial review -> a
//! committed worktree merge.
//!
//! The drafting node emits only tests on its first pass and only
//! implementation code on every pass after that. A configured test command
//! runs between those two passes (and after every subsequent implementation
//! draft); its exit code, not anything the LLM claims, decides whether the
//! stage proceeds to human review or loops back to drafting.

use async_trait::async_trait;
use camino::Utf8PathBuf;
use std::sync::Arc;
use warden_audit::AuditDir;
use warden_gate::{GateMode, Interaction};
use warden_llm::{LlmBackend, LlmInvocation, Message};
use warden_phase_api::{Node, NodeContext, NodeOutcome, WorkflowState};
use warden_utils::error::{AuditError, GovernanceError, GuardError};

use crate::common::{DraftGateNode, ReviewGateNode, ReviewNode, SandboxNode};
use crate::handoff;

pub const LOAD_LLD: &str = "load-lld";
pub const SANDBOX: &str = "sandbox";
pub const DRAFT: &str = "draft";
pub const RUN_TESTS: &str = "run-tests";
pub const HUMAN_EDIT_DRAFT: &str = "human-edit-draft";
pub const REVIEW: &str = "review";
pub const HUMAN_EDIT_VERDICT: &str = "human-edit-verdict";
pub const FINALIZE: &str = "finalize";

const IMPL_TEST_TEMPLATE: &str = include_str!("../templates/impl_test_template.md");
const IMPL_CODE_TEMPLATE: &str = include_str!("../templates/impl_code_template.md");
const IMPL_REVIEW_PROMPT: &str = include_str!("../templates/impl_review_prompt.md");

pub struct LoadLldNode {
    pub active_parent: Utf8PathBuf,
    pub lld_path: Utf8PathBuf,
}

#[async_trait]
impl Node for LoadLldNode {
    fn id(&self) -> &'static str {
        LOAD_LLD
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let content = std::fs::read_to_string(self.lld_path.as_std_path()).map_err(GovernanceError::Io)?;

        let audit = match AuditDir::create_active(&self.active_parent, &state.slug) {
            Ok(dir) => dir,
            Err(AuditError::SlugCollision { .. }) => {
                state.error_message = Some("SLUG_COLLISION".to_string());
                return Ok(NodeOutcome::Completed);
            }
            Err(e) => return Err(GovernanceError::Audit(e)),
        };
        audit.save(1, "lld.md", &content).map_err(GovernanceError::Audit)?;

        state.source_text = Some(content);
        state.file_counter = 2;
        state.next_node = Some(SANDBOX.to_string());
        Ok(NodeOutcome::Completed)
    }
}

/// Test-first drafting: `draft_count == 0` produces tests only; every later
/// pass produces implementation code incorporating the latest test-run
/// failure (if any) as feedback.
pub struct TestFirstDraftNode {
    pub backend: Arc<dyn LlmBackend>,
    pub model: String,
    pub timeout_secs: u64,
    pub audit: Arc<AuditDir>,
    pub mock_tests: String,
    pub mock_code: String,
}

#[async_trait]
impl Node for TestFirstDraftNode {
    fn id(&self) -> &'static str {
        DRAFT
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let writing_tests = state.draft_count == 0;
        let template = if writing_tests { IMPL_TEST_TEMPLATE } else { IMPL_CODE_TEMPLATE };
        let original = state.source_text.clone().unwrap_or_default();

        let response = if state.mock_mode {
            if writing_tests { self.mock_tests.clone() } else { self.mock_code.clone() }
        } else {
            let mut prompt = format!("{template}\n\n{original}");
            if let Some(feedback) = &state.latest_feedback {
                prompt.push_str("\n\n## Test run feedback\n\n");
                prompt.push_str(feedback);
            }
            let inv = LlmInvocation::new("drafter", &self.model, std::time::Duration::from_secs(self.timeout_secs), vec![Message::user(prompt)]);
            match self.backend.invoke(inv).await {
                Ok(result) => result.raw_response,
                Err(e) => {
                    state.error_message = Some(format!("API_ERROR: {e}"));
                    return Ok(NodeOutcome::Completed);
                }
            }
        };

        let suffix = if writing_tests { "tests.md" } else { "code.md" };
        let number = state.file_counter;
        let path = self.audit.save(number, suffix, &response).map_err(GovernanceError::Audit)?;

        state.latest_draft = Some(response);
        state.latest_draft_path = Some(path);
        state.latest_feedback = None;
        state.draft_count += 1;
        state.file_counter = number + 1;
        state.error_message = None;
        state.next_node = Some(RUN_TESTS.to_string());

        Ok(NodeOutcome::Completed)
    }
}

/// Runs the configured test command and routes on its exit code. Never
/// trusts the LLM's own claim about whether tests pass.
pub struct TestRunNode {
    pub repo_root: Utf8PathBuf,
    pub test_command: String,
    pub audit: Arc<AuditDir>,
}

#[async_trait]
impl Node for TestRunNode {
    fn id(&self) -> &'static str {
        RUN_TESTS
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let after_tests_only_draft = state.draft_count == 1;

        let (passed, output) = if state.mock_mode {
            (!after_tests_only_draft, "mock test run".to_string())
        } else {
            let result = tokio::process::Command::new("sh")
                .arg("-c")
                .arg(&self.test_command)
                .current_dir(self.repo_root.as_std_path())
                .output()
                .await
                .map_err(GovernanceError::Io)?;
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&result.stdout),
                String::from_utf8_lossy(&result.stderr)
            );
            (result.status.success(), combined)
        };

        let number = state.file_counter;
        self.audit.save(number, "test-run.txt", &output).map_err(GovernanceError::Audit)?;
        state.file_counter = number + 1;

        if after_tests_only_draft {
            // Expected to fail (no implementation yet); always proceed to
            // drafting the implementation.
            state.next_node = Some(DRAFT.to_string());
            return Ok(NodeOutcome::Completed);
        }

        if passed {
            state.next_node = Some(HUMAN_EDIT_DRAFT.to_string());
        } else {
            let prefix = if output.to_lowercase().contains("import") || output.to_lowercase().contains("unresolved") {
                "FAILED_IMPORT"
            } else {
                "TEST_FAILED"
            };
            state.latest_feedback = Some(format!("{prefix}: {output}"));
            state.next_node = Some(DRAFT.to_string());
        }

        Ok(NodeOutcome::Completed)
    }
}

pub struct ImplFinalizeNode {
    pub active_parent: Utf8PathBuf,
    pub done_parent: Utf8PathBuf,
    pub repo_root: Utf8PathBuf,
    pub checkpoint: Arc<warden_checkpoint::CheckpointStore>,
}

#[async_trait]
impl Node for ImplFinalizeNode {
    fn id(&self) -> &'static str {
        FINALIZE
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let Some(issue_id) = state.external_id.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::MissingInput { field: "external_id".into() }));
            return Ok(NodeOutcome::Completed);
        };

        // The actual worktree commit and cleanup handoff is delegated to the
        // host environment (see Stage Handoff, C9); this node only records
        // completion of the governed portion of the work.
        let audit = AuditDir::open(&self.active_parent, &state.slug);
        handoff::finalize(&audit, &self.done_parent, &self.repo_root, &self.checkpoint, state, &issue_id, "approved.json", None, None, None)
            .map_err(GovernanceError::Audit)?;

        Ok(NodeOutcome::Completed)
    }
}

/// Builds the full implementation-stage graph and returns its entry node id.
#[allow(clippy::too_many_arguments)]
pub fn build(
    active_parent: Utf8PathBuf,
    done_parent: Utf8PathBuf,
    repo_root: Utf8PathBuf,
    lld_path: Utf8PathBuf,
    test_command: String,
    drafter: Arc<dyn LlmBackend>,
    reviewer: Arc<dyn LlmBackend>,
    model: String,
    timeout_secs: u64,
    max_iterations: u32,
    interaction: Arc<dyn Interaction>,
    gate_mode: GateMode,
    editor_timeout_secs: u64,
    checkpoint: Arc<warden_checkpoint::CheckpointStore>,
    audit: Arc<AuditDir>,
) -> (warden_engine::Graph, &'static str) {
    let nodes: Vec<Arc<dyn Node>> = vec![
        Arc::new(LoadLldNode { active_parent: active_parent.clone(), lld_path }),
        Arc::new(SandboxNode { node_id: SANDBOX, next_node: DRAFT, tracker: None, editor_configured: std::env::var("EDITOR").is_ok() }),
        Arc::new(TestFirstDraftNode {
            backend: drafter,
            model: model.clone(),
            timeout_secs,
            audit: audit.clone(),
            mock_tests: "```rust\n#[test]\nfn widget_round_trips() { assert!(true); }\n```".to_string(),
            mock_code: "```rust\npub struct Widget;\n```".to_string(),
        }),
        Arc::new(TestRunNode { repo_root: repo_root.clone(), test_command, audit: audit.clone() }),
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
            review_prompt: IMPL_REVIEW_PROMPT,
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
        Arc::new(ImplFinalizeNode { active_parent, done_parent, repo_root, checkpoint }),
    ];

    (warden_engine::Graph::new(nodes), LOAD_LLD)
}
