//! Assistant orchestration logic and repository trait definitions for TaskPilot.
//!
//! This crate defines the "ports" (repository and model-client traits) that
//! the infrastructure layer implements, plus the assistant pipeline built on
//! them. It depends only on `taskpilot-types` -- never on `taskpilot-infra`
//! or any database/HTTP crate.

pub mod assistant;
pub mod llm;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;
