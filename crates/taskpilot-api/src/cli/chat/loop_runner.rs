//! Main chat loop.
//!
//! Reads a line, dispatches slash commands locally, and submits everything
//! else to the session. Each submission runs to completion before the next
//! line is read, so the session never sees a second request in flight.

use console::style;
use tracing::warn;

use taskpilot_core::assistant::mode::select_mode;
use taskpilot_core::repository::settings::SettingsRepository;
use taskpilot_core::repository::task::TaskRepository;
use taskpilot_infra::llm::resolve_endpoint;
use taskpilot_types::chat::MessageRole;
use taskpilot_types::error::SessionError;

use crate::cli::ask::print_turn;
use crate::cli::spinner;
use crate::cli::task::{print_statistics, print_task_table};
use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let settings = state.settings_repo.get().await?;
    let stats = state.task_repo.statistics().await?;
    print_welcome_banner(
        select_mode(&settings),
        &resolve_endpoint(&settings).provider,
        &settings.model,
        stats.pending + stats.in_progress,
    );

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) = ChatInput::new(prompt)
        .map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => {
                if text.is_empty() {
                    continue;
                }

                if let Some(cmd) = commands::parse(&text) {
                    match cmd {
                        ChatCommand::Help => commands::print_help(),
                        ChatCommand::Tasks => match state.task_repo.list(None).await {
                            Ok(tasks) if tasks.is_empty() => {
                                println!("\n  {}\n", style("No tasks yet.").dim())
                            }
                            Ok(tasks) => print_task_table(&tasks),
                            Err(e) => println!("\n  {} {e}\n", style("!").red().bold()),
                        },
                        ChatCommand::Stats => match state.task_repo.statistics().await {
                            Ok(stats) => print_statistics(&stats, false)?,
                            Err(e) => println!("\n  {} {e}\n", style("!").red().bold()),
                        },
                        ChatCommand::History => print_history(state),
                        ChatCommand::Clear => {
                            state.session.clear_transcript();
                            chat_input.clear();
                        }
                        ChatCommand::Exit => {
                            println!("\n  {}", style("Session ended.").dim());
                            break;
                        }
                        ChatCommand::Unknown(name) => println!(
                            "\n  {} Unknown command: {}. Type /help for available commands.\n",
                            style("?").yellow().bold(),
                            style(name).dim()
                        ),
                    }
                    continue;
                }

                let spinner = spinner("thinking...");
                let result = state.session.submit(&text).await;
                spinner.finish_and_clear();

                match result {
                    Ok(outcome) => print_turn(&outcome),
                    Err(SessionError::EmptyMessage) => {}
                    Err(e @ SessionError::Busy) => {
                        warn!(error = %e, "Submission rejected");
                        println!("\n  {} {e}\n", style("!").yellow().bold());
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_history(state: &AppState) {
    let transcript = state.session.transcript();
    if transcript.is_empty() {
        println!("\n  {}\n", style("No messages yet.").dim());
        return;
    }

    println!();
    for message in &transcript {
        let label = match message.role {
            MessageRole::User => style("You").green(),
            MessageRole::Assistant => style("Assistant").cyan(),
            MessageRole::System => style("System").yellow(),
        };
        let preview: String = message.content.chars().take(100).collect();
        let ellipsis = if message.content.chars().count() > 100 { "..." } else { "" };
        println!("  {} {}{}", label.bold(), preview.replace('\n', " "), ellipsis);
    }
    println!();
}
