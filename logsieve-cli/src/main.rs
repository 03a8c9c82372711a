use clap::Parser;
use colored::Colorize;

use logsieve_cli::cli::Cli;
use logsieve_cli::commands;
use logsieve_cli::logging::init_tracing;
use logsieve_cli::output::OutputWriter;
use logsieve_core::config::{GeneralConfig, SieveConfig};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logging comes from the file before validation so `config validate`
    // can still report a broken file.
    let general = match SieveConfig::from_file(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            config.general
        }
        Err(_) => GeneralConfig::default(),
    };
    if let Err(e) = init_tracing(&general, cli.log_level.as_deref()) {
        eprintln!("{} {:#}; using default logging", "warning:".yellow().bold(), e);
        if let Err(e) = init_tracing(&GeneralConfig::default(), None) {
            eprintln!("{} {:#}", "warning:".yellow().bold(), e);
        }
    }

    tracing::debug!(config = %cli.config.display(), "logsieve starting");

    let writer = OutputWriter::new(cli.output);
    if let Err(e) = commands::execute(cli.command, &cli.config, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}
