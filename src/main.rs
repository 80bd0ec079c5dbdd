use std::path::PathBuf;

use clap::Parser;
use skyrank_core::{AppError, Config, ForecastError, OutputFormat};
use skyrank_weather::{create_sink, HttpForecastSource, Pipeline};

/// Rank cities by how warm and dry their daytime forecast is
#[derive(Debug, Parser)]
#[command(name = "skyrank", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to write the per-city results
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format: json or csv
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Maximum number of concurrent forecast requests
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = skyrank_core::init() {
        eprintln!("Failed to initialize logging: {:#}", err);
    }
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        tracing::error!("{}", err);
        eprintln!("{}", err.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let mut config =
        Config::load_validated(cli.config.as_deref()).map_err(AppError::from_anyhow)?;
    if let Some(output) = cli.output {
        config.output.path = output;
    }
    if let Some(format) = cli.format {
        config.output.format = format;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch.concurrency = concurrency;
    }

    let source = HttpForecastSource::new(&config.fetch, &config.cities)?;
    let pipeline = Pipeline::new(source, config.fetch.concurrency);
    let mut sink = create_sink(config.output.format, &config.output.path);

    let report = pipeline
        .run(&config.city_names(), sink.as_mut())
        .await
        .map_err(ForecastError::from)?;

    tracing::info!("Ranked {} cities", report.cities.len());
    println!("Best city: {}", report.best);
    Ok(())
}
