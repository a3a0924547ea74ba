//! Shared domain types for TaskPilot.
//!
//! This crate contains the domain types used across the TaskPilot workspace:
//! tasks, chat transcript messages, assistant replies, assistant settings,
//! model wire types, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod probe;
pub mod settings;
pub mod task;
