//! Interactive CLI chat with the assistant.
//!
//! Slash commands, a typing spinner while a reply is pending, and the
//! welcome banner. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
