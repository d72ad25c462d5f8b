use chrono::Local;
use clap::Parser;
use std::process::ExitCode;
use therapy_roster::cli::{self, Cli};
use therapy_roster::{RosterManager, Settings};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("error: could not load settings: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let today = Local::now().date_naive();

    let result = RosterManager::connect(&settings)
        .map_err(anyhow::Error::from)
        .and_then(|mut manager| cli::execute(cli.command, &mut manager, today));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
