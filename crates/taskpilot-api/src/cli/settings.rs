//! Settings CLI commands: show, set, test, reset.
//!
//! Edits are persisted immediately; a running chat session picks them up on
//! its next request.

use anyhow::{Result, anyhow, bail};
use clap::Subcommand;
use console::style;
use dialoguer::{Confirm, Password};

use taskpilot_core::assistant::mode::select_mode;
use taskpilot_core::assistant::session::call_error_text;
use taskpilot_core::repository::settings::SettingsRepository;
use taskpilot_infra::config::api_key_from_env;
use taskpilot_infra::llm::{resolve_endpoint, test_connection};
use taskpilot_types::llm::find_preset;
use taskpilot_types::settings::{AssistantSettings, FunctionCallingMode};

use crate::state::AppState;

use super::spinner;

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Show the current settings (API key masked).
    Show,

    /// Change one or more settings.
    Set {
        /// API key. Pass the flag without a value to be prompted.
        #[arg(long, num_args = 0..=1)]
        api_key: Option<Option<String>>,

        /// Remove the stored API key (switches to the local assistant).
        #[arg(long, conflicts_with = "api_key")]
        clear_api_key: bool,

        /// Provider preset id; also sets its base URL and default model.
        #[arg(long)]
        provider: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature (0.0 - 2.0).
        #[arg(long)]
        temperature: Option<f32>,

        #[arg(long)]
        max_tokens: Option<u32>,

        /// Function calling mode: auto, tools, functions, disabled.
        #[arg(long)]
        mode: Option<String>,

        /// Parse JSON from plain text when structured calls are unavailable.
        #[arg(long)]
        text_fallback: Option<bool>,

        #[arg(long)]
        system_prompt: Option<String>,
    },

    /// Check that the endpoint accepts the configured API key.
    Test,

    /// Restore defaults (including removing the API key).
    Reset {
        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

/// Requested changes, applied on top of the stored settings.
#[derive(Debug, Default)]
struct SettingsChanges {
    api_key: Option<Option<String>>,
    provider: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    mode: Option<FunctionCallingMode>,
    text_fallback: Option<bool>,
    system_prompt: Option<String>,
}

pub async fn handle_settings_command(
    cmd: SettingsCommand,
    state: &AppState,
    json: bool,
) -> Result<()> {
    match cmd {
        SettingsCommand::Show => show_settings(state, json).await,
        SettingsCommand::Set {
            api_key,
            clear_api_key,
            provider,
            base_url,
            model,
            temperature,
            max_tokens,
            mode,
            text_fallback,
            system_prompt,
        } => {
            let api_key = match api_key {
                Some(Some(key)) => Some(Some(key)),
                Some(None) => Some(Some(
                    Password::new().with_prompt("API key").interact()?,
                )),
                None if clear_api_key => Some(None),
                None => None,
            };
            let changes = SettingsChanges {
                api_key,
                provider,
                base_url,
                model,
                temperature,
                max_tokens,
                mode: mode
                    .as_deref()
                    .map(|m| m.parse::<FunctionCallingMode>().map_err(|e| anyhow!(e)))
                    .transpose()?,
                text_fallback,
                system_prompt,
            };
            set_settings(state, changes, json).await
        }
        SettingsCommand::Test => test_settings(state, json).await,
        SettingsCommand::Reset { force } => reset_settings(state, force, json).await,
    }
}

async fn show_settings(state: &AppState, json: bool) -> Result<()> {
    let settings = state.settings_repo.get().await?;
    let endpoint = resolve_endpoint(&settings);

    if json {
        let view = serde_json::json!({
            "api_key": settings.masked_api_key(),
            "api_key_from_env": api_key_from_env().is_some(),
            "api_base_url": settings.api_base_url,
            "model": settings.model,
            "temperature": settings.temperature,
            "max_tokens": settings.max_tokens,
            "function_calling_mode": settings.function_calling_mode,
            "enable_text_fallback": settings.enable_text_fallback,
            "provider": endpoint.provider,
            "wire_format": endpoint.wire_format,
            "mode": select_mode(&settings),
        });
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let key_display = match settings.masked_api_key() {
        Some(masked) if api_key_from_env().is_some() => format!("{masked} (from environment)"),
        Some(masked) => masked,
        None => format!("{}", style("not set (local assistant)").yellow()),
    };

    println!();
    println!("  {}  {}", style("Assistant:").bold(), select_mode(&settings));
    println!("  {}  {}", style("API key:").bold(), key_display);
    println!(
        "  {}  {} ({})",
        style("Provider:").bold(),
        endpoint.provider,
        style(endpoint.wire_format).dim()
    );
    println!("  {}  {}", style("Base URL:").bold(), settings.api_base_url);
    println!("  {}  {}", style("Model:").bold(), style(&settings.model).cyan());
    println!("  {}  {}", style("Temperature:").bold(), settings.temperature);
    println!("  {}  {}", style("Max tokens:").bold(), settings.max_tokens);
    println!(
        "  {}  {}",
        style("Function calling:").bold(),
        settings.function_calling_mode
    );
    println!(
        "  {}  {}",
        style("Text fallback:").bold(),
        if settings.enable_text_fallback { "on" } else { "off" }
    );
    println!();
    println!("  {}", style("System prompt:").bold());
    for line in settings.system_prompt.lines() {
        println!("    {}", style(line).dim());
    }
    println!();
    Ok(())
}

/// Apply changes to settings, validating ranges and preset ids.
fn apply_changes(settings: &mut AssistantSettings, changes: SettingsChanges) -> Result<()> {
    if let Some(id) = &changes.provider {
        let preset = find_preset(id).ok_or_else(|| {
            anyhow!("unknown provider '{id}'. See `tpilot providers` for the list")
        })?;
        settings.provider = Some(preset.id.to_string());
        settings.api_base_url = preset.base_url.to_string();
        settings.model = preset.default_model.to_string();
    }
    if let Some(key) = changes.api_key {
        settings.api_key = key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
    }
    if let Some(url) = changes.base_url {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            bail!("base URL must start with http:// or https://");
        }
        settings.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(model) = changes.model {
        if model.trim().is_empty() {
            bail!("model must not be empty");
        }
        settings.model = model.trim().to_string();
    }
    if let Some(temperature) = changes.temperature {
        if !(0.0..=2.0).contains(&temperature) {
            bail!("temperature must be between 0.0 and 2.0");
        }
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = changes.max_tokens {
        if max_tokens == 0 {
            bail!("max tokens must be positive");
        }
        settings.max_tokens = max_tokens;
    }
    if let Some(mode) = changes.mode {
        settings.function_calling_mode = mode;
    }
    if let Some(enabled) = changes.text_fallback {
        settings.enable_text_fallback = enabled;
    }
    if let Some(prompt) = changes.system_prompt {
        settings.system_prompt = prompt;
    }
    Ok(())
}

async fn set_settings(state: &AppState, changes: SettingsChanges, json: bool) -> Result<()> {
    let mut settings = state.settings_repo.get().await?;
    apply_changes(&mut settings, changes)?;
    state.settings_repo.save(&settings).await?;

    tracing::info!(model = %settings.model, mode = %settings.function_calling_mode, "Settings updated");

    if json {
        return show_settings(state, true).await;
    }
    println!();
    println!("  {} Settings saved", style("✓").green().bold());
    show_settings(state, false).await
}

async fn test_settings(state: &AppState, json: bool) -> Result<()> {
    let settings = state.settings_repo.get().await?;
    let endpoint = resolve_endpoint(&settings);

    let spinner = (!json).then(|| spinner("Testing connection..."));
    let result = test_connection(&settings, state.config.request_timeout()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    if json {
        let view = match &result {
            Ok(ok) => serde_json::json!({ "success": ok, "provider": endpoint.provider }),
            Err(e) => serde_json::json!({
                "success": false,
                "provider": endpoint.provider,
                "error": call_error_text(e),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!();
    match result {
        Ok(true) => println!(
            "  {} Connected to {} ({})",
            style("✓").green().bold(),
            style(&endpoint.provider).cyan(),
            settings.base_url()
        ),
        Ok(false) => println!(
            "  {} {} rejected the request. Check the API key and base URL.",
            style("✗").red().bold(),
            endpoint.provider
        ),
        Err(e) => println!("  {} {}", style("✗").red().bold(), call_error_text(&e)),
    }
    println!();
    Ok(())
}

async fn reset_settings(state: &AppState, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt("Reset all assistant settings to defaults?")
            .default(false)
            .interact()?;
        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.settings_repo.save(&AssistantSettings::default()).await?;

    if json {
        println!("{}", serde_json::json!({ "reset": true }));
    } else {
        println!("  {} Settings reset to defaults", style("✓").green().bold());
    }
    Ok(())
}
