//! `tpilot providers`: the built-in provider preset table.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use taskpilot_types::llm::{PROVIDER_PRESETS, WireFormat};

pub fn list_providers(json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(PROVIDER_PRESETS)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Base URL").fg(Color::White),
        Cell::new("Wire format").fg(Color::White),
        Cell::new("Default model").fg(Color::White),
    ]);

    for preset in PROVIDER_PRESETS {
        let wire_cell = match preset.wire_format {
            WireFormat::OpenAiChat => Cell::new("openai chat"),
            WireFormat::GeminiGenerateContent => Cell::new("gemini").fg(Color::Cyan),
        };
        table.add_row(vec![
            Cell::new(preset.id).fg(Color::Green),
            Cell::new(preset.name),
            Cell::new(preset.base_url).fg(Color::DarkGrey),
            wire_cell,
            Cell::new(preset.default_model),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  Select one with: {}",
        style("tpilot settings set --provider <id> --api-key").yellow()
    );
    println!();
    Ok(())
}
