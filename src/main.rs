#![allow(non_snake_case)]

use std::env;
use std::process::ExitCode;

use clap::Parser;
use eventPlanner::cli::{self, Cli};
use eventPlanner::config::{AppConfig, Settings};
use eventPlanner::error::Result;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so command output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match env::var("CONFIG_FILE") {
        Ok(path) => AppConfig::from_file(&path)?,
        Err(_) => AppConfig::default(),
    };
    let settings = Settings::resolve(&config)?;
    cli::cli(cli, settings).await
}
