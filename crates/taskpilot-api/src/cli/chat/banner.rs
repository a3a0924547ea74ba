//! Welcome banner for chat sessions.

use console::style;

use taskpilot_types::settings::AssistantMode;

/// Print the banner: which backend answers, and with what model.
pub fn print_welcome_banner(mode: AssistantMode, provider: &str, model: &str, open_tasks: u32) {
    println!();
    println!("  {} {}", "✦", style("TaskPilot").cyan().bold());
    println!(
        "  {}",
        style("告诉我你的目标，我来帮你拆解成任务。").dim()
    );
    println!();
    match mode {
        AssistantMode::Remote => {
            println!("  {}  {}", style("Provider:").bold(), style(provider).dim());
            println!("  {}  {}", style("Model:").bold(), style(model).dim());
        }
        AssistantMode::Local => {
            println!(
                "  {}  {}",
                style("Assistant:").bold(),
                style("local (no API key configured)").yellow()
            );
        }
    }
    println!("  {}  {}", style("Open tasks:").bold(), open_tasks);
    println!();
    println!(
        "  {}",
        style("Type /help for commands, Ctrl+D to exit").dim()
    );
    println!("  {}", style("---").dim());
    println!();
}
