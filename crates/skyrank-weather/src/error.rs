//! Error types for fetching, persisting and ranking forecasts.

use skyrank_core::{ForecastError, NetworkError};
use thiserror::Error;

/// Failure to obtain one city's forecast.
///
/// Never fatal for a batch: the fetch stage logs it and drops the city.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Unknown city: {0}")]
    UnknownCity(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Forecast API returned status {0}")]
    Status(u16),

    #[error("Failed to decode forecast: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether the failure is transient
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_transient(),
            Self::Status(status) => *status >= 500 || *status == 429,
            Self::UnknownCity(_) | Self::Decode(_) => false,
        }
    }
}

/// Failure to persist reduced rows
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Batch-level outcomes that leave nothing to report
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No forecasts fetched for {requested} requested cities")]
    EmptyBatch { requested: usize },

    #[error("No city had daytime forecast data")]
    NoRankableCity,

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl From<PipelineError> for ForecastError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyBatch { requested } => ForecastError::NoData(requested),
            PipelineError::NoRankableCity => ForecastError::NothingToRank,
            PipelineError::Sink(e) => ForecastError::Output(e.to_string()),
        }
    }
}
