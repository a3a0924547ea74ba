//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (taskpilot-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod settings;
pub mod task;
