//! The node contract. A node receives the live state and may mutate it in
//! place; the engine is responsible for snapshotting afterward. A node that
//! wants to leave the workflow exactly where it was (the "manual exit" case)
//! returns [`NodeOutcome::Interrupted`] instead of mutating routing fields —
//! the engine discards any mutation it made and re-enters the same node on
//! the next run.

use crate::state::WorkflowState;
use async_trait::async_trait;
use std::collections::HashMap;
use warden_utils::error::GovernanceError;

/// Read-only execution context threaded through every node: configuration
/// values and redaction/size limits that do not belong in persisted state.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    pub config: HashMap<String, String>,
    pub draft_size_ceiling_bytes: usize,
}

impl NodeContext {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }
}

/// What happened when a node ran, from the graph engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeOutcome {
    /// The node completed; its mutations to `WorkflowState` are kept and
    /// checkpointed, and the router should read `next_node`/`error_message`.
    Completed,
    /// Cooperative interrupt: discard mutations made during this call and
    /// re-enter the same node next run. Used only by gate nodes handling a
    /// manual-exit choice.
    Interrupted,
}

#[async_trait]
pub trait Node: Send + Sync {
    /// Stable identifier used as a graph vertex name and in `next_node`.
    fn id(&self) -> &'static str;

    /// Runs the node's pre-guard, does its work (or short-circuits under
    /// `state.mock_mode`), and mutates `state` in place.
    async fn run(&self, ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoNode;

    #[async_trait]
    impl Node for EchoNode {
        fn id(&self) -> &'static str {
            "echo"
        }

        async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
            state.next_node = Some("next".into());
            Ok(NodeOutcome::Completed)
        }
    }

    #[tokio::test]
    async fn node_mutates_state_in_place() {
        let node = EchoNode;
        let mut state = WorkflowState::new("issue", "widget");
        let ctx = NodeContext::default();
        let outcome = node.run(&ctx, &mut state).await.unwrap();
        assert_eq!(outcome, NodeOutcome::Completed);
        assert_eq!(state.next_node.as_deref(), Some("next"));
    }
}
