//! The node contract: every node is a pure function of [`WorkflowState`] to
//! a delta, plus the shared state shape every stage reads and writes.

pub mod node;
pub mod state;

pub use node::{Node, NodeContext, NodeOutcome};
pub use state::{Verdict, WorkflowState};
