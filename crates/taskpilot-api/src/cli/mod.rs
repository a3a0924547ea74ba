//! CLI command definitions and dispatch for the `tpilot` binary.
//!
//! Uses clap derive macros for argument parsing. Resource commands follow a
//! noun-verb pattern (e.g., `tpilot task add`, `tpilot settings show`).

pub mod ask;
pub mod chat;
pub mod probe;
pub mod providers;
pub mod settings;
pub mod task;

use std::time::Duration;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use indicatif::{ProgressBar, ProgressStyle};

/// A task list with an AI planning assistant.
#[derive(Parser)]
#[command(name = "tpilot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat with the assistant.
    Chat,

    /// Send one message to the assistant and print the reply.
    Ask {
        /// The message to send.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Manage tasks (list, add, done, update, delete, clear-completed, stats).
    Task {
        #[command(subcommand)]
        action: task::TaskCommand,
    },

    /// View or change assistant settings.
    Settings {
        #[command(subcommand)]
        action: settings::SettingsCommand,
    },

    /// List the known provider presets.
    Providers,

    /// Check whether the configured model creates tasks through function calls.
    Probe,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Steady-ticking spinner for waits on the assistant or the network.
pub fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}
