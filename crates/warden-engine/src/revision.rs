//! The revision loop controller (C7): cumulative feedback accumulation and
//! the bound on how many times a stage may cycle between drafting and
//! review.

use warden_phase_api::{Verdict, WorkflowState};

pub struct RevisionLoop;

impl RevisionLoop {
    /// Builds the drafting prompt for `state.iteration_count`. On the first
    /// iteration this is just `original` plus `template`; on later
    /// iterations, the latest feedback and the full, never-truncated verdict
    /// history are appended so the drafter cannot regress on an earlier
    /// critique while fixing the latest one.
    #[must_use]
    pub fn build_prompt(original: &str, template: &str, state: &WorkflowState) -> String {
        let mut prompt = format!("{template}\n\n{original}");

        if state.iteration_count > 0 {
            if let Some(feedback) = &state.latest_feedback {
                prompt.push_str("\n\n## Latest feedback\n\n");
                prompt.push_str(feedback);
            }
            if !state.verdict_history.is_empty() {
                prompt.push_str("\n\n## Cumulative review history\n");
                for v in &state.verdict_history {
                    prompt.push_str(&format!("\n### Iteration {}\n{}\n", v.iteration, v.raw_text));
                }
            }
        }

        prompt
    }

    /// `None` while still within bound; `Some(error_message)` with the
    /// `MAX_ITERATIONS_REACHED:` prefix once the bound is exceeded without
    /// approval.
    #[must_use]
    pub fn check_bound(state: &WorkflowState, max_iterations: u32) -> Option<String> {
        if !state.is_approved() && state.iteration_count > max_iterations {
            Some(format!("MAX_ITERATIONS_REACHED:{}", state.iteration_count))
        } else {
            None
        }
    }

    /// The successor node name after a review: the finalize node on
    /// approval, the drafting node otherwise.
    #[must_use]
    pub fn route_after_review<'a>(approved: bool, finalize_node: &'a str, draft_node: &'a str) -> &'a str {
        if approved { finalize_node } else { draft_node }
    }

    /// Appends a verdict to history, keeping `verdict_count` in sync (the
    /// invariant the data model requires).
    pub fn record_verdict(state: &mut WorkflowState, verdict: Verdict) {
        state.push_verdict(verdict);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_iteration_prompt_has_no_history_section() {
        let state = WorkflowState::new("lld", "widget");
        let prompt = RevisionLoop::build_prompt("brief body", "template", &state);
        assert!(!prompt.contains("Cumulative review history"));
        assert!(prompt.contains("brief body"));
    }

    #[test]
    fn later_iteration_includes_full_history_never_truncated() {
        let mut state = WorkflowState::new("lld", "widget");
        state.iteration_count = 2;
        state.push_verdict(Verdict { iteration: 1, approved: false, raw_text: "fix the title".into(), model_identity_warning: None });
        state.push_verdict(Verdict { iteration: 2, approved: false, raw_text: "fix the body too".into(), model_identity_warning: None });

        let prompt = RevisionLoop::build_prompt("brief body", "template", &state);
        assert!(prompt.contains("fix the title"));
        assert!(prompt.contains("fix the body too"));
    }

    #[test]
    fn bound_is_none_when_approved_even_at_limit() {
        let mut state = WorkflowState::new("lld", "widget");
        state.iteration_count = 21;
        state.push_verdict(Verdict { iteration: 21, approved: true, raw_text: "[x] **APPROVED**".into(), model_identity_warning: None });
        assert!(RevisionLoop::check_bound(&state, 20).is_none());
    }

    #[test]
    fn bound_fires_past_limit_without_approval() {
        let mut state = WorkflowState::new("lld", "widget");
        state.iteration_count = 21;
        state.push_verdict(Verdict { iteration: 21, approved: false, raw_text: "[x] **REVISE**".into(), model_identity_warning: None });
        let msg = RevisionLoop::check_bound(&state, 20).unwrap();
        assert_eq!(msg, "MAX_ITERATIONS_REACHED:21");
    }

    #[test]
    fn route_after_review_picks_finalize_on_approval() {
        assert_eq!(RevisionLoop::route_after_review(true, "finalize", "draft"), "finalize");
        assert_eq!(RevisionLoop::route_after_review(false, "finalize", "draft"), "draft");
    }
}
