//! `tpilot ask`: one-shot submission to the assistant.

use anyhow::Result;
use console::style;

use taskpilot_core::assistant::session::TurnOutcome;
use taskpilot_types::chat::{ChatMessage, MessageRole, ReplyKind};
use taskpilot_types::settings::AssistantMode;

use crate::state::AppState;

use super::spinner;

pub async fn ask(state: &AppState, text: &str, json: bool) -> Result<()> {
    let spinner = (!json).then(|| spinner("thinking..."));
    let outcome = state.session.submit(text).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = outcome?;

    if json {
        let view = serde_json::json!({
            "mode": outcome.mode,
            "dialect": outcome.dialect,
            "reply": outcome.reply,
            "created": outcome.created,
            "messages": outcome.messages,
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_turn(&outcome);
    Ok(())
}

/// Print what a turn appended to the transcript, except the user's own
/// message. Shared with the chat loop.
pub fn print_turn(outcome: &TurnOutcome) {
    let label = match outcome.mode {
        AssistantMode::Local => "Assistant (local)",
        AssistantMode::Remote => "Assistant",
    };

    for message in &outcome.messages {
        match message.role {
            MessageRole::User => {}
            MessageRole::Assistant => {
                println!();
                let name = if outcome.reply.kind() == ReplyKind::Error {
                    style(label).red().bold()
                } else {
                    style(label).cyan().bold()
                };
                println!("  {name}");
                print_indented(message);
            }
            MessageRole::System => {
                println!("  {}", style(&message.content).yellow());
            }
        }
    }

    if !outcome.created.is_empty() {
        for task in &outcome.created {
            println!("    {} {}", style("+").green(), task.text);
        }
    }
    println!();
}

fn print_indented(message: &ChatMessage) {
    for line in message.content.lines() {
        println!("  {line}");
    }
}
