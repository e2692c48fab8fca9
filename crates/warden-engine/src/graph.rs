//! Drives a named set of nodes to completion, checkpointing after every
//! node boundary and honoring the cooperative-interrupt / error-routing
//! rules from the node contract.

use std::collections::HashMap;
use std::sync::Arc;
use warden_checkpoint::CheckpointStore;
use warden_phase_api::{Node, NodeContext, NodeOutcome, WorkflowState};
use warden_utils::error::GovernanceError;

pub struct Graph {
    nodes: HashMap<&'static str, Arc<dyn Node>>,
}

impl Graph {
    #[must_use]
    pub fn new(nodes: Vec<Arc<dyn Node>>) -> Self {
        let nodes = nodes.into_iter().map(|n| (n.id(), n)).collect();
        Self { nodes }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Node>> {
        self.nodes.get(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Reached a node with no further routing and no error: the workflow is
    /// done (not necessarily finalized — the last node run decides that).
    Completed,
    /// Either a cooperative interrupt (manual exit) or a routed error;
    /// `state.error_message` distinguishes the two. The checkpoint reflects
    /// a resumable position either way.
    Paused,
}

/// Runs `graph` starting at `entry`, reading `state.next_node` after every
/// node completion to choose the successor. A non-empty `error_message`
/// after any node always ends the run (terminal route), per the routing
/// rules: recoverable kinds are the caller's responsibility to clear before
/// re-entering.
pub async fn run(
    graph: &Graph,
    entry: &str,
    ctx: &NodeContext,
    checkpoint: &CheckpointStore,
    state: &mut WorkflowState,
) -> Result<RunOutcome, GovernanceError> {
    let mut current = entry.to_string();

    loop {
        let node = graph
            .get(&current)
            .unwrap_or_else(|| panic!("workflow graph has no node named '{current}'"))
            .clone();

        let before = state.clone();
        let outcome = node.run(ctx, state).await?;

        match outcome {
            NodeOutcome::Interrupted => {
                *state = before;
                // Resume must re-enter the same node: nothing else records
                // "current" outside this field, so the interrupted node's
                // own id is preserved here even though a normal completion
                // would have consumed it already.
                state.next_node = Some(current.clone());
                checkpoint.save(&state.thread_id(), state)?;
                return Ok(RunOutcome::Paused);
            }
            NodeOutcome::Completed => {
                if state.error_message.as_deref().is_some_and(|m| !m.is_empty()) {
                    // Same reasoning as the interrupted branch: resume needs
                    // a node to re-enter, and a node that set error_message
                    // typically left next_node untouched.
                    state.next_node = Some(current.clone());
                    checkpoint.save(&state.thread_id(), state)?;
                    return Ok(RunOutcome::Paused);
                }

                checkpoint.save(&state.thread_id(), state)?;

                match state.next_node.take() {
                    Some(next) => current = next,
                    None => return Ok(RunOutcome::Completed),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StartNode;
    #[async_trait]
    impl Node for StartNode {
        fn id(&self) -> &'static str {
            "start"
        }
        async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
            state.iteration_count += 1;
            state.next_node = Some("end".into());
            Ok(NodeOutcome::Completed)
        }
    }

    struct EndNode;
    #[async_trait]
    impl Node for EndNode {
        fn id(&self) -> &'static str {
            "end"
        }
        async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
            state.final_external_id = Some("done".into());
            Ok(NodeOutcome::Completed)
        }
    }

    struct ManualExitNode;
    #[async_trait]
    impl Node for ManualExitNode {
        fn id(&self) -> &'static str {
            "gate"
        }
        async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
            state.next_node = Some("should-not-be-observed".into());
            Ok(NodeOutcome::Interrupted)
        }
    }

    #[tokio::test]
    async fn runs_to_completion_following_next_node() {
        let graph = Graph::new(vec![Arc::new(StartNode), Arc::new(EndNode)]);
        let checkpoint = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("issue", "widget");
        let ctx = NodeContext::default();

        let outcome = run(&graph, "start", &ctx, &checkpoint, &mut state).await.unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(state.final_external_id.as_deref(), Some("done"));
        assert_eq!(state.iteration_count, 1);
    }

    #[tokio::test]
    async fn interrupt_discards_mutation_and_does_not_advance_checkpoint() {
        let graph = Graph::new(vec![Arc::new(ManualExitNode)]);
        let checkpoint = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("issue", "widget");
        let ctx = NodeContext::default();

        let outcome = run(&graph, "gate", &ctx, &checkpoint, &mut state).await.unwrap();
        assert_eq!(outcome, RunOutcome::Paused);
        assert_eq!(state.next_node.as_deref(), Some("gate"));

        let saved = checkpoint.load(&state.thread_id()).unwrap().unwrap();
        assert_eq!(saved.next_node.as_deref(), Some("gate"));
    }

    #[tokio::test]
    async fn error_message_halts_the_run() {
        struct FailingNode;
        #[async_trait]
        impl Node for FailingNode {
            fn id(&self) -> &'static str {
                "fail"
            }
            async fn run(&self, _ctx: &NodeContext, state: &mut WorkflowState) -> Result<NodeOutcome, GovernanceError> {
                state.error_message = Some("GUARD: draft empty".into());
                state.next_node = Some("end".into());
                Ok(NodeOutcome::Completed)
            }
        }

        let graph = Graph::new(vec![Arc::new(FailingNode), Arc::new(EndNode)]);
        let checkpoint = CheckpointStore::open_in_memory();
        let mut state = WorkflowState::new("issue", "widget");
        let ctx = NodeContext::default();

        let outcome = run(&graph, "fail", &ctx, &checkpoint, &mut state).await.unwrap();
        assert_eq!(outcome, RunOutcome::Paused);
        assert!(state.final_external_id.is_none());
    }
}
