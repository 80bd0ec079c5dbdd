//! Forecast sources: the trait the pipeline fetches through and its HTTP
//! implementation against a Yandex-Weather-style forecast API.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use skyrank_core::{CityConfig, FetchConfig, NetworkError, ReqwestErrorExt};
use tracing::instrument;

use crate::error::FetchError;
use crate::types::{CityForecast, DayRecord, HourRecord, SkyCondition};

const API_KEY_HEADER: &str = "X-Yandex-API-Key";
const FORECAST_DAYS: u8 = 7;

/// Anything that can produce a city's forecast.
///
/// Calls for different cities are independent and may run concurrently.
pub trait ForecastSource: Send + Sync + 'static {
    fn fetch(
        &self,
        city: &str,
    ) -> impl Future<Output = Result<CityForecast, FetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    forecasts: Vec<ApiDay>,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    date: NaiveDate,
    #[serde(default)]
    hours: Vec<ApiHour>,
}

#[derive(Debug, Deserialize)]
struct ApiHour {
    hour: ApiHourValue,
    temp: f64,
    #[serde(default)]
    condition: SkyCondition,
}

/// The API sends hours as strings ("8"); accept plain numbers too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiHourValue {
    Number(u8),
    Text(String),
}

impl ApiHourValue {
    fn parse(&self) -> Result<u8, FetchError> {
        let hour = match self {
            Self::Number(h) => *h,
            Self::Text(s) => s
                .trim()
                .parse::<u8>()
                .map_err(|e| FetchError::Decode(format!("invalid hour {:?}: {}", s, e)))?,
        };
        if hour > 23 {
            return Err(FetchError::Decode(format!("hour out of range: {}", hour)));
        }
        Ok(hour)
    }
}

impl ForecastResponse {
    fn into_forecast(self, city: &str) -> Result<CityForecast, FetchError> {
        let days = self
            .forecasts
            .into_iter()
            .map(|day| -> Result<DayRecord, FetchError> {
                let hours = day
                    .hours
                    .into_iter()
                    .map(|h| -> Result<HourRecord, FetchError> {
                        Ok(HourRecord::new(h.hour.parse()?, h.temp, h.condition))
                    })
                    .collect::<Result<Vec<HourRecord>, FetchError>>()?;
                Ok(DayRecord {
                    date: day.date,
                    hours,
                })
            })
            .collect::<Result<Vec<DayRecord>, FetchError>>()?;

        Ok(CityForecast {
            city: city.to_string(),
            days,
        })
    }
}

/// Fetches forecasts over HTTP for a fixed table of cities
#[derive(Debug, Clone)]
pub struct HttpForecastSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    cities: HashMap<String, CityConfig>,
}

impl HttpForecastSource {
    pub fn new(config: &FetchConfig, cities: &[CityConfig]) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| e.into_network_error())?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
            cities: cities
                .iter()
                .map(|c| (c.name.clone(), c.clone()))
                .collect(),
        })
    }

    #[instrument(skip(self), level = "info")]
    async fn request(&self, city: &CityConfig) -> Result<CityForecast, FetchError> {
        let url = format!(
            "{}/v2/forecast?lat={}&lon={}&hours=true&limit={}",
            self.base_url, city.latitude, city.longitude, FORECAST_DAYS
        );

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.into_network_error()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Network(e.into_network_error()))?;

        let parsed: ForecastResponse =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        let forecast = parsed.into_forecast(&city.name)?;
        tracing::debug!("Fetched {} days for {}", forecast.days.len(), city.name);
        Ok(forecast)
    }
}

impl ForecastSource for HttpForecastSource {
    async fn fetch(&self, city: &str) -> Result<CityForecast, FetchError> {
        let config = self
            .cities
            .get(city)
            .ok_or_else(|| FetchError::UnknownCity(city.to_string()))?;
        self.request(config).await
    }
}
