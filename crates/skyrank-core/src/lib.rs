pub mod config;
pub mod error;

pub use config::{CityConfig, Config, FetchConfig, OutputConfig, OutputFormat, ValidationResult};
pub use error::{AppError, ConfigError, ForecastError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize logging for the skyrank binaries
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("Skyrank core initialized");
    Ok(())
}
