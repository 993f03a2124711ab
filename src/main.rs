use std::process::ExitCode;

use clap::Parser as _;
use laredo_scraper::cli::Cli;
use laredo_scraper::{execute, logging, LaredoScraper, ScraperConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(Some(&cli.log_file)) {
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }
    tracing::debug!(?cli, "parsed cli");

    let config: ScraperConfig = cli.into();
    let mut scraper = LaredoScraper::new(config.clone());

    match execute(&mut scraper, &config).await {
        Ok(result) => {
            tracing::info!("Done: {} records", result.records.len());
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
