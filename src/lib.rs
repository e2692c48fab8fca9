//! The `warden` binary's library half: CLI parsing and dispatch. The actual
//! engine, gate protocol, audit store, and stage compositions live in their
//! own crates; this crate only wires them together for a terminal session.

pub mod cli;
