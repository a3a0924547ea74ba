//! Infrastructure layer for TaskPilot.
//!
//! Contains implementations of the ports defined in `taskpilot-core`:
//! SQLite task and settings stores, the OpenAI-compatible and Gemini HTTP
//! clients, and the `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
