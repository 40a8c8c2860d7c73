use crate::cmd::load_config;
use crate::output::{print_json, print_table};
use crate::Ctx;
use anyhow::Context;
use cibyl_core::config::{Config, WarnLevel};
use cibyl_core::output::OutputFormat;
use clap::Subcommand;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show where the configuration was read from and what it defines
    Show,

    /// Validate the configuration for common mistakes
    Validate,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(ctx: &Ctx, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Ctx) -> anyhow::Result<()> {
    let (config, location) =
        Config::discover(ctx.config.as_deref()).context("failed to load configuration")?;

    if ctx.format == OutputFormat::Json {
        let value = serde_json::json!({
            "location": location,
            "environments": config.environments,
        });
        return print_json(&value);
    }

    println!("Configuration: {location}");
    print!("{}", config.summary());
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Ctx) -> anyhow::Result<()> {
    let config = load_config(ctx.config.as_deref())?;
    let warnings = config.validate();

    if ctx.format == OutputFormat::Json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        let rows = warnings
            .iter()
            .map(|w| {
                let level = match w.level {
                    WarnLevel::Warning => "warning",
                    WarnLevel::Error => "error",
                };
                vec![level.to_string(), w.message.clone()]
            })
            .collect();
        print_table(&["LEVEL", "MESSAGE"], rows);
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
