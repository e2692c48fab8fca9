//! The three concrete stage compositions (issue, LLD, implementation) built
//! from the generic node shapes in `common`, plus the finalize/handoff
//! logic shared by all three.

mod common;
pub mod handoff;
pub mod impl_stage;
pub mod issue;
pub mod lld;

pub use warden_engine::{Graph, RunOutcome};
