//! TaskPilot CLI entry point.
//!
//! Binary name: `tpilot`
//!
//! Parses CLI arguments, loads configuration, opens the database, then
//! dispatches to the command handler.

mod cli;
mod state;

use clap::Parser;
use clap_complete::generate;

use taskpilot_infra::config::{load_global_config, resolve_data_dir};
use taskpilot_observe::tracing_setup::{
    TracingOptions, filter_for_verbosity, init_tracing, otel_requested, shutdown_tracing,
};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "tpilot", &mut std::io::stdout());
        return Ok(());
    }

    let data_dir = resolve_data_dir();
    let config = load_global_config(&data_dir).await;

    init_tracing(&TracingOptions {
        filter: filter_for_verbosity(cli.verbose, cli.quiet),
        json: config.log_json,
        otel: otel_requested(),
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))?;

    let result = run(cli, data_dir, config).await;
    shutdown_tracing();
    result
}

async fn run(
    cli: Cli,
    data_dir: std::path::PathBuf,
    config: taskpilot_types::config::GlobalConfig,
) -> anyhow::Result<()> {
    let state = AppState::init(data_dir, config).await?;

    match cli.command {
        Commands::Chat => cli::chat::loop_runner::run_chat_loop(&state).await?,
        Commands::Ask { text } => cli::ask::ask(&state, &text.join(" "), cli.json).await?,
        Commands::Task { action } => cli::task::handle_task_command(action, &state, cli.json).await?,
        Commands::Settings { action } => {
            cli::settings::handle_settings_command(action, &state, cli.json).await?
        }
        Commands::Providers => cli::providers::list_providers(cli.json)?,
        Commands::Probe => cli::probe::probe(&state, cli.json).await?,
        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
