//! Verareport - Veracode Detailed Report Tool
//!
//! CLI tool for retrieving a build's detailed report and printing its flaws
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;
use verareport::{cli, credentials};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Parse CLI arguments
    let args = cli::Cli::parse();

    info!("Verareport - Veracode Detailed Report Tool");

    match verareport::run(&args, credentials::env_lookup).await {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
