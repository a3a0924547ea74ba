//! Slash command parsing for the chat loop.

use console::style;

#[derive(Debug, PartialEq)]
pub enum ChatCommand {
    /// Show available commands.
    Help,
    /// Show the task list.
    Tasks,
    /// Show task counts by status.
    Stats,
    /// Show this session's transcript.
    History,
    /// Clear the transcript and the screen.
    Clear,
    /// Exit the chat.
    Exit,
    Unknown(String),
}

/// Parse user input as a slash command.
///
/// Returns `None` if the input doesn't start with `/`.
pub fn parse(input: &str) -> Option<ChatCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let cmd = trimmed
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match cmd.as_str() {
        "/help" | "/h" | "/?" => Some(ChatCommand::Help),
        "/tasks" | "/list" | "/ls" => Some(ChatCommand::Tasks),
        "/stats" => Some(ChatCommand::Stats),
        "/history" => Some(ChatCommand::History),
        "/clear" | "/cls" => Some(ChatCommand::Clear),
        "/exit" | "/quit" | "/q" => Some(ChatCommand::Exit),
        other => Some(ChatCommand::Unknown(other.to_string())),
    }
}

pub fn print_help() {
    println!();
    println!("  {}", style("Available commands:").bold());
    println!();
    println!("  {}     {}", style("/help").cyan(), "Show this help message");
    println!("  {}    {}", style("/tasks").cyan(), "Show the task list");
    println!("  {}    {}", style("/stats").cyan(), "Show task counts");
    println!("  {}  {}", style("/history").cyan(), "Show this conversation");
    println!(
        "  {}    {}",
        style("/clear").cyan(),
        "Clear the conversation and the screen"
    );
    println!("  {}     {}", style("/exit").cyan(), "End the chat");
    println!();
    println!(
        "  {}",
        style("Try: 帮我制定一个学习 Rust 的计划 / 总结一下我的进度").dim()
    );
    println!();
}
