//! Weather favorability ranking for skyrank
//!
//! Fetches multi-day forecasts per city, reduces each city to a running
//! daytime average and picks the most favorable city.

pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod provider;
pub mod rank;
pub mod reduce;
pub mod sink;
pub mod types;

pub use error::{FetchError, PipelineError, SinkError};
pub use fetch::fetch_all;
pub use pipeline::{Pipeline, PipelineReport};
pub use provider::{ForecastSource, HttpForecastSource};
pub use rank::Ranker;
pub use reduce::{fold_city_average, reduce_city, reduce_day};
pub use sink::{create_sink, CityRow, CitySink, CsvSink, JsonSink, MemorySink};
pub use types::*;
