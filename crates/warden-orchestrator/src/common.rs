//! Node shapes shared by every stage's backbone: draft, review, the two
//! gate kinds, and a pre-flight sandbox check. Each stage wires these up
//! with its own templates, prompts, and finalize node.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use warden_audit::AuditDir;
use warden_engine::RevisionLoop;
use warden_gate::{GateDecision, GateMode, Interaction};
use warden_llm::{LlmBackend, LlmInvocation, Message};
use warden_phase_api::{Node, NodeContext, NodeOutcome, Verdict, WorkflowState};
use warden_tracker::TrackerClient;
use warden_utils::error::{GateError, GovernanceError, GuardError, LlmError, TrackerError};

static MODEL_IDENTITY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^MODEL_IDENTITY:\s*(.+)$").unwrap());

fn gate_error_message(e: GateError) -> String {
    match e {
        GateError::TimedOut { secs } => format!("TIMEOUT: gate timed out after {secs}s"),
        GateError::EditorFailed { status } => format!("API_ERROR: editor exited with status {status}"),
        GateError::NoEditor => "API_ERROR: no editor configured".to_string(),
        GateError::ManualExit { node } => format!("MANUAL: exited at {node}"),
    }
}

fn llm_error_message(e: LlmError) -> String {
    match e {
        LlmError::TimedOut { secs } => format!("TIMEOUT: LLM call exceeded {secs}s"),
        other => format!("API_ERROR: {other}"),
    }
}

/// Carries a tracker failure into `state.error_message` rather than raising
/// it across the node boundary, mirroring `llm_error_message`.
pub(crate) fn tracker_error_message(e: TrackerError) -> String {
    match e {
        TrackerError::TimedOut { secs } => format!("TIMEOUT: tracker call exceeded {secs}s"),
        other => format!("API_ERROR: {other}"),
    }
}

/// Invokes the drafter with the cumulative-feedback prompt, postprocesses
/// the response (e.g. stripping preamble), writes the audit entry, and
/// routes to `next_node`.
pub struct DraftNode {
    pub node_id: &'static str,
    pub next_node: &'static str,
    pub template: &'static str,
    pub backend: Arc<dyn LlmBackend>,
    pub model: String,
    pub timeout_secs: u64,
    pub audit: Arc<AuditDir>,
    pub postprocess: fn(&str) -> String,
    pub mock_draft: String,
}

#[async_trait]
impl Node for DraftNode {
    fn id(&self) -> &'static str {
        self.node_id
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let original = state.source_text.clone().unwrap_or_default();

        let response = if state.mock_mode {
            self.mock_draft.clone()
        } else {
            let prompt = RevisionLoop::build_prompt(&original, self.template, state);
            let inv = LlmInvocation::new("drafter", &self.model, Duration::from_secs(self.timeout_secs), vec![Message::user(prompt)]);
            match self.backend.invoke(inv).await {
                Ok(result) => result.raw_response,
                Err(e) => {
                    state.error_message = Some(llm_error_message(e));
                    return Ok(NodeOutcome::Completed);
                }
            }
        };

        let processed = (self.postprocess)(&response);

        let number = state.file_counter;
        let path = self
            .audit
            .save(number, "draft.md", &processed)
            .map_err(GovernanceError::Audit)?;

        state.latest_draft = Some(processed);
        state.latest_draft_path = Some(path);
        state.latest_feedback = None;
        state.draft_count += 1;
        state.file_counter = number + 1;
        state.error_message = None;
        state.next_node = Some(self.next_node.to_string());

        Ok(NodeOutcome::Completed)
    }
}

/// Invokes the reviewer, parses the verdict sentinel and the model-identity
/// line, enforces the size guard, and bounds the loop at `max_iterations`.
pub struct ReviewNode {
    pub node_id: &'static str,
    pub gate_node: &'static str,
    pub review_prompt: &'static str,
    pub backend: Arc<dyn LlmBackend>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_iterations: u32,
    pub audit: Arc<AuditDir>,
    pub mock_verdict: String,
}

#[async_trait]
impl Node for ReviewNode {
    fn id(&self) -> &'static str {
        self.node_id
    }

    async fn run(&self, ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let draft = match &state.latest_draft {
            None => {
                state.error_message = Some(format!("GUARD: {}", GuardError::EmptyDraft));
                return Ok(NodeOutcome::Completed);
            }
            Some(d) if d.is_empty() => {
                state.error_message = Some(format!("GUARD: {}", GuardError::EmptyDraft));
                return Ok(NodeOutcome::Completed);
            }
            Some(d) => d.clone(),
        };

        if ctx.draft_size_ceiling_bytes > 0 && draft.len() > ctx.draft_size_ceiling_bytes {
            state.error_message = Some(format!(
                "GUARD: {}",
                GuardError::DraftTooLarge { limit: ctx.draft_size_ceiling_bytes, actual: draft.len() }
            ));
            return Ok(NodeOutcome::Completed);
        }

        let (raw_response, identity) = if state.mock_mode {
            (self.mock_verdict.clone(), "mock-reviewer-pro".to_string())
        } else {
            let prompt = format!("{}\n\n## Draft under review\n\n{draft}", self.review_prompt);
            let inv = LlmInvocation::new("reviewer", &self.model, Duration::from_secs(self.timeout_secs), vec![Message::user(prompt)]);
            match self.backend.invoke(inv).await {
                Ok(result) => {
                    let identity = MODEL_IDENTITY_LINE
                        .captures(result.raw_response.lines().next().unwrap_or(""))
                        .map(|c| c[1].trim().to_string())
                        .unwrap_or_else(|| "unknown".to_string());
                    (result.raw_response, identity)
                }
                Err(e) => {
                    state.error_message = Some(llm_error_message(e));
                    return Ok(NodeOutcome::Completed);
                }
            }
        };

        let (parsed, stored_text) = warden_verdict::parse_with_identity(&raw_response, &identity);

        let number = state.file_counter;
        self.audit.save(number, "verdict.md", &stored_text).map_err(GovernanceError::Audit)?;
        state.file_counter = number + 1;

        state.iteration_count += 1;
        state.push_verdict(Verdict {
            iteration: state.iteration_count,
            approved: parsed.approved,
            raw_text: stored_text,
            model_identity_warning: parsed.model_identity_warning,
        });

        if let Some(bound_msg) = RevisionLoop::check_bound(state, self.max_iterations) {
            state.error_message = Some(bound_msg);
            return Ok(NodeOutcome::Completed);
        }

        state.error_message = None;
        state.next_node = Some(self.gate_node.to_string());
        Ok(NodeOutcome::Completed)
    }
}

/// The first human gate: open the draft, offer proceed / revise / manual
/// exit.
pub struct DraftGateNode {
    pub node_id: &'static str,
    pub mode: GateMode,
    pub interaction: Arc<dyn Interaction>,
    pub editor_timeout_secs: u64,
    pub proceed_next: &'static str,
    pub revise_next: &'static str,
}

#[async_trait]
impl Node for DraftGateNode {
    fn id(&self) -> &'static str {
        self.node_id
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let Some(path) = state.latest_draft_path.clone() else {
            state.error_message = Some(format!("GUARD: {}", GuardError::MissingInput { field: "latest_draft_path".into() }));
            return Ok(NodeOutcome::Completed);
        };

        match warden_gate::run_draft_gate(self.mode, self.interaction.as_ref(), &path, self.editor_timeout_secs) {
            Ok(GateDecision::Proceed) => {
                state.next_node = Some(self.proceed_next.to_string());
                Ok(NodeOutcome::Completed)
            }
            Ok(GateDecision::ReturnForRevision(feedback)) => {
                state.latest_feedback = Some(feedback);
                state.next_node = Some(self.revise_next.to_string());
                Ok(NodeOutcome::Completed)
            }
            Ok(GateDecision::ManualExit) => {
                state.error_message = Some(format!("MANUAL: exited at {}", self.node_id));
                Ok(NodeOutcome::Interrupted)
            }
            Err(e) => {
                state.error_message = Some(gate_error_message(e));
                Ok(NodeOutcome::Completed)
            }
        }
    }
}

/// The post-review gate: opens the verdict non-blocking (or not at all in
/// automatic mode) and auto-routes on the parsed verdict.
pub struct ReviewGateNode {
    pub node_id: &'static str,
    pub mode: GateMode,
    pub interaction: Arc<dyn Interaction>,
    pub finalize_next: &'static str,
    pub draft_next: &'static str,
}

#[async_trait]
impl Node for ReviewGateNode {
    fn id(&self) -> &'static str {
        self.node_id
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        let path = state.latest_draft_path.clone().unwrap_or_default();
        let approved = state.is_approved();

        match warden_gate::run_review_gate(self.mode, self.interaction.as_ref(), &path, approved) {
            Ok(_decision) => {
                state.next_node = Some(RevisionLoop::route_after_review(approved, self.finalize_next, self.draft_next).to_string());
                Ok(NodeOutcome::Completed)
            }
            Err(e) => {
                state.error_message = Some(gate_error_message(e));
                Ok(NodeOutcome::Completed)
            }
        }
    }
}

/// Pre-flight checks before any stateful work: editor availability and
/// tracker authentication (skipped under `mock_mode`).
pub struct SandboxNode {
    pub node_id: &'static str,
    pub next_node: &'static str,
    pub tracker: Option<Arc<TrackerClient>>,
    pub editor_configured: bool,
}

#[async_trait]
impl Node for SandboxNode {
    fn id(&self) -> &'static str {
        self.node_id
    }

    async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
        if !state.mock_mode {
            if !self.editor_configured && !state.auto_mode {
                state.error_message = Some("API_ERROR: no editor configured; set $EDITOR".to_string());
                return Ok(NodeOutcome::Completed);
            }
            if let Some(tracker) = &self.tracker {
                if let Err(e) = tracker.check_auth().await {
                    state.error_message = Some(format!("API_ERROR: {e}"));
                    return Ok(NodeOutcome::Completed);
                }
            }
        }

        state.next_node = Some(self.next_node.to_string());
        Ok(NodeOutcome::Completed)
    }
}
