//! Fan-out stage: one fetch task per city with a bounded number in flight.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use tracing::Level;

use crate::error::FetchError;
use crate::provider::ForecastSource;
use crate::types::CityForecast;

/// Fetch every city's forecast, at most `concurrency` at a time.
///
/// A failed fetch is logged and the city left out; it never stops the
/// others. Successful forecasts come back in the order of `cities`.
pub async fn fetch_all<S: ForecastSource>(
    source: Arc<S>,
    cities: &[String],
    concurrency: usize,
) -> Vec<CityForecast> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for (index, city) in cities.iter().cloned().enumerate() {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            // The semaphore is never closed, so a permit is always granted
            let _permit = semaphore.acquire_owned().await.ok();
            let result = source.fetch(&city).await;
            (index, city, result)
        });
    }

    let mut fetched = Vec::with_capacity(cities.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, _, Ok(forecast))) => fetched.push((index, forecast)),
            Ok((_, city, Err(e))) => {
                log_skipped(&city, &e);
            }
            Err(e) => tracing::error!("Fetch task failed: {}", e),
        }
    }

    tracing::info!("Fetched {} of {} cities", fetched.len(), cities.len());
    fetched.sort_by_key(|(index, _)| *index);
    fetched.into_iter().map(|(_, forecast)| forecast).collect()
}

/// Log a dropped city. Transient failures warn; permanent ones are errors.
fn log_skipped(city: &str, err: &FetchError) -> Level {
    if err.is_retryable() {
        tracing::warn!("Skipping {}: {}", city, err);
        Level::WARN
    } else {
        tracing::error!("Skipping {}: {}", city, err);
        Level::ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyrank_core::NetworkError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Serves an empty forecast for every city except those listed as failing
    struct StubSource {
        failing: Vec<String>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl StubSource {
        fn new(failing: &[&str]) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl ForecastSource for StubSource {
        async fn fetch(&self, city: &str) -> Result<CityForecast, FetchError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.iter().any(|f| f == city) {
                return Err(FetchError::Status(500));
            }
            Ok(CityForecast {
                city: city.to_string(),
                days: Vec::new(),
            })
        }
    }

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("City{}", i)).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_preserves_order() {
        let cities = names(12);
        let fetched = fetch_all(Arc::new(StubSource::new(&[])), &cities, 4).await;
        let got: Vec<String> = fetched.into_iter().map(|f| f.city).collect();
        assert_eq!(got, cities);
    }

    #[tokio::test]
    async fn test_failed_city_is_omitted() {
        let cities = names(5);
        let fetched = fetch_all(Arc::new(StubSource::new(&["City1", "City3"])), &cities, 2).await;
        let got: Vec<String> = fetched.into_iter().map(|f| f.city).collect();
        assert_eq!(got, vec!["City0", "City2", "City4"]);
    }

    #[tokio::test]
    async fn test_all_failures_yield_empty() {
        let cities = names(2);
        let fetched = fetch_all(Arc::new(StubSource::new(&["City0", "City1"])), &cities, 2).await;
        assert!(fetched.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let source = Arc::new(StubSource::new(&[]));
        let cities = names(20);
        fetch_all(Arc::clone(&source), &cities, 3).await;
        let peak = source.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight fetches was {}", peak);
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_fetches() {
        let cities = names(3);
        let fetched = fetch_all(Arc::new(StubSource::new(&[])), &cities, 0).await;
        assert_eq!(fetched.len(), 3);
    }

    #[test]
    fn test_skip_level_follows_failure_kind() {
        assert_eq!(log_skipped("Moscow", &FetchError::Status(503)), Level::WARN);
        assert_eq!(
            log_skipped("Moscow", &FetchError::Network(NetworkError::Timeout)),
            Level::WARN
        );
        assert_eq!(log_skipped("Moscow", &FetchError::Status(401)), Level::ERROR);
        assert_eq!(
            log_skipped("Atlantis", &FetchError::UnknownCity("Atlantis".into())),
            Level::ERROR
        );
    }
}
