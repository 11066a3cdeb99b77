//! gopt - keep `go install`ed binaries up to date
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use gopt::cli::{Cli, Commands};
use gopt::config::ConfigManager;
use gopt::error::GoptResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    tokio::select! {
        result = run() => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
                if let Some(hint) = e.hint() {
                    eprintln!("{} {}", style("Hint:").yellow(), hint);
                }
                ExitCode::FAILURE
            }
        },
        // Dropping `run` kills any running `go` child; replaces never await
        _ = tokio::signal::ctrl_c() => {
            eprintln!("{} interrupted", style("Error:").red().bold());
            ExitCode::from(130)
        }
    }
}

async fn run() -> GoptResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config {}", config_manager.path().display());
    gopt::ui::init_theme();

    let no_cache = cli.no_cache;
    match cli.command {
        Commands::List(args) => gopt::cli::commands::list(args, &config, no_cache).await,
        Commands::Update(args) => gopt::cli::commands::update(args, &config, no_cache).await,
        Commands::Install(args) => gopt::cli::commands::install(args, &config, no_cache).await,
        Commands::Status => gopt::cli::commands::status(&config, &config_manager).await,
        Commands::Config(args) => {
            gopt::cli::commands::config(args, &config, &config_manager).await
        }
        Commands::Cache(args) => gopt::cli::commands::cache(args, &config).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `RUST_LOG` wins when set
fn init_logging(verbose: u8, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("gopt=warn"),
        1 => EnvFilter::new("gopt=info"),
        _ => EnvFilter::new("gopt=debug"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
