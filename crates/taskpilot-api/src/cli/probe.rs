//! `tpilot probe`: diagnostic check of structured function calling.
//!
//! Sends a fixed prompt that asks the model to create three test tasks
//! through `add_tasks`, then reports which dialect answered. Tasks the model
//! asks for are really created.

use anyhow::Result;
use console::style;

use taskpilot_core::assistant::probe::run_probe;
use taskpilot_core::assistant::session::call_error_text;
use taskpilot_core::llm::ModelConnector;
use taskpilot_core::repository::settings::SettingsRepository;
use taskpilot_types::probe::ProbeReport;

use crate::state::AppState;

use super::spinner;

pub async fn probe(state: &AppState, json: bool) -> Result<()> {
    let settings = state.settings_repo.get().await?;

    let client = match state.connector.connect(&settings) {
        Ok(client) => client,
        Err(e) => {
            if json {
                let view = serde_json::json!({ "success": false, "message": call_error_text(&e) });
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                println!();
                println!("  {} {}", style("✗").red().bold(), call_error_text(&e));
                println!();
            }
            return Ok(());
        }
    };

    let spinner = (!json).then(|| spinner("Probing function calling..."));
    let report = run_probe(client, &settings, state.task_repo.as_ref()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ProbeReport) {
    let mark = if report.success {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };

    println!();
    println!("  {mark} {}", report.message);
    println!();
    println!("  {}  {}", style("Mode:").bold(), report.mode);
    println!(
        "  {}  {}",
        style("Dialect:").bold(),
        report
            .dialect
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    println!(
        "  {}  {}",
        style("Function called:").bold(),
        match &report.function_name {
            Some(name) if report.function_called => name.clone(),
            Some(name) => format!("{name} (unrecognized)"),
            None => "no".to_string(),
        }
    );
    println!("  {}  {}", style("Tasks created:").bold(), report.tasks_created);

    if let Some(sample) = &report.raw_response_sample {
        println!();
        println!("  {}", style("Reply sample:").bold());
        for line in sample.lines() {
            println!("    {}", style(line).dim());
        }
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("  {}", style("Recommendations:").bold());
        for rec in &report.recommendations {
            println!("    {} {rec}", style("•").dim());
        }
    }
    println!();
}
