//! The assistant pipeline.
//!
//! user text -> [`session::ChatSession`] -> [`mode::select_mode`] ->
//! {[`simulator::LocalSimulator`] | [`remote::RemoteAdapter`]} ->
//! [`parser::classify`] -> [`materializer::ActionMaterializer`] (generation only).

pub mod dialect;
pub mod materializer;
pub mod mode;
pub mod parser;
pub mod probe;
pub mod prompt;
pub mod remote;
pub mod session;
pub mod simulator;
pub mod tool;
