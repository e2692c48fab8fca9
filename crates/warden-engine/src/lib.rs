//! The workflow graph executor (C6) and the revision loop controller (C7).
//! The graph itself is a static backbone owned by each stage (in
//! `warden-orchestrator`); this crate only knows how to drive it.

pub mod graph;
pub mod revision;

pub use graph::{Graph, RunOutcome};
pub use revision::RevisionLoop;
