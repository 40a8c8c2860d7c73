mod cmd;
mod output;

use anyhow::Context;
use cibyl_core::output::OutputFormat;
use clap::{ArgAction, Parser, Subcommand};
use cmd::{config::ConfigSubcommand, query::QueryOpts};
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Parser)]
#[command(
    name = "cibyl",
    about = "Query CI environments: Jenkins, Jenkins Job Builder and Zuul",
    version,
    propagate_version = true
)]
struct Cli {
    /// Configuration file path or http(s) URL
    #[arg(long, short = 'c', global = true, env = "CIBYL_CONFIG")]
    config: Option<String>,

    /// Turn on debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// More details in the output (repeat for more)
    #[arg(short = 'v', global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format: text, colorized or json
    #[arg(long, short = 'f', global = true, default_value = "colorized")]
    output_format: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the configured CI systems
    Query(QueryOpts),

    /// Inspect the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Global settings every subcommand reads.
pub struct Ctx {
    pub config: Option<String>,
    pub verbosity: u8,
    pub format: OutputFormat,
}

fn init_logging(debug: bool, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.debug, cli.log_file.as_ref()) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }

    let ctx = Ctx {
        config: cli.config,
        verbosity: cli.verbose,
        format: cli.output_format,
    };

    let result = match cli.command {
        Commands::Query(opts) => cmd::query::run(&ctx, opts),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
