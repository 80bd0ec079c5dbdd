//! Staged forecast pipeline: fetch all, reduce all, then rank all.
//!
//! Each stage joins before the next begins, so no stage sees partial output
//! from the one before it.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::fetch::fetch_all;
use crate::provider::ForecastSource;
use crate::rank::Ranker;
use crate::reduce::reduce_all;
use crate::sink::CitySink;
use crate::types::{CityStat, RankableCity};

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Reduced cities in the caller's order, failed fetches omitted
    pub cities: Vec<CityStat>,
    pub best: RankableCity,
}

pub struct Pipeline<S> {
    source: Arc<S>,
    concurrency: usize,
}

impl<S: ForecastSource> Pipeline<S> {
    pub fn new(source: S, concurrency: usize) -> Self {
        Self {
            source: Arc::new(source),
            concurrency,
        }
    }

    /// Run every stage for `cities`, writing each reduced city to `sink`.
    ///
    /// Returns [`PipelineError::EmptyBatch`] without reducing anything when no
    /// fetch succeeded, and [`PipelineError::NoRankableCity`] when no city
    /// had daytime data.
    pub async fn run(
        &self,
        cities: &[String],
        sink: &mut dyn CitySink,
    ) -> Result<PipelineReport, PipelineError> {
        tracing::info!("Fetching forecasts for {} cities", cities.len());
        let forecasts = fetch_all(Arc::clone(&self.source), cities, self.concurrency).await;
        if forecasts.is_empty() {
            tracing::warn!("No forecasts fetched; nothing to rank");
            return Err(PipelineError::EmptyBatch {
                requested: cities.len(),
            });
        }

        tracing::info!("Reducing {} forecasts", forecasts.len());
        let reduced = reduce_all(forecasts).await;

        for city in &reduced {
            sink.put(city)?;
        }
        sink.finish()?;

        tracing::info!("Ranking {} cities", reduced.len());
        let ranker = Arc::new(Ranker::new());
        let best = ranker
            .rank(&reduced)
            .await
            .ok_or(PipelineError::NoRankableCity)?;

        Ok(PipelineReport {
            cities: reduced,
            best,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::sink::MemorySink;
    use crate::types::{CityForecast, DayRecord, HourRecord, SkyCondition};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves canned forecasts; cities without one fail
    #[derive(Default)]
    struct CannedSource {
        forecasts: HashMap<String, CityForecast>,
        calls: AtomicUsize,
    }

    impl CannedSource {
        /// Add a city with one slice of `(hour, temp, condition)` per day
        fn with_city(mut self, name: &str, days: &[&[(u8, f64, SkyCondition)]]) -> Self {
            let days = days
                .iter()
                .enumerate()
                .map(|(i, hours)| DayRecord {
                    date: NaiveDate::from_ymd_opt(2022, 5, 26 + i as u32).unwrap(),
                    hours: hours
                        .iter()
                        .map(|&(h, t, c)| HourRecord::new(h, t, c))
                        .collect(),
                })
                .collect();
            self.forecasts.insert(
                name.to_string(),
                CityForecast {
                    city: name.to_string(),
                    days,
                },
            );
            self
        }
    }

    impl ForecastSource for CannedSource {
        async fn fetch(&self, city: &str) -> Result<CityForecast, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.forecasts
                .get(city)
                .cloned()
                .ok_or(FetchError::Status(503))
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_run_reports_best_city_and_writes_rows() {
        use SkyCondition::{Clear, Cloudy, LightRain};
        let source = CannedSource::default()
            .with_city(
                "Moscow",
                &[
                    &[(8, 13.0, Cloudy), (9, 13.0, Cloudy), (19, 15.0, LightRain), (20, 14.0, LightRain)],
                    &[(8, 11.0, LightRain), (9, 12.0, Cloudy), (19, 13.0, Cloudy), (20, 13.0, Cloudy)],
                ],
            )
            .with_city("Cairo", &[&[(10, 31.0, Clear), (14, 33.0, Clear)]])
            .with_city("London", &[&[(12, 14.0, LightRain)]]);

        let pipeline = Pipeline::new(source, 4);
        let mut sink = MemorySink::default();
        let report = pipeline
            .run(&names(&["Moscow", "Cairo", "London"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(report.best, RankableCity::new("Cairo", 32.0, 2.0));
        let order: Vec<&str> = report.cities.iter().map(|c| c.city.as_str()).collect();
        assert_eq!(order, vec!["Moscow", "Cairo", "London"]);
        assert_eq!(report.cities[0].avg_temp(), Some(13.3));
        assert_eq!(report.cities[0].avg_dry(), Some(1.5));

        let rows: Vec<&str> = sink.rows.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(rows, vec!["Moscow", "Cairo", "London"]);
    }

    #[tokio::test]
    async fn test_failed_city_is_omitted_from_rows() {
        let source = CannedSource::default()
            .with_city("Rome", &[&[(12, 25.0, SkyCondition::Clear)]]);

        let pipeline = Pipeline::new(source, 2);
        let mut sink = MemorySink::default();
        let report = pipeline
            .run(&names(&["Atlantis", "Rome"]), &mut sink)
            .await
            .unwrap();

        assert_eq!(report.cities.len(), 1);
        assert_eq!(sink.rows.len(), 1);
        assert_eq!(report.best.name, "Rome");
    }

    #[tokio::test]
    async fn test_empty_batch_short_circuits() {
        let pipeline = Pipeline::new(CannedSource::default(), 4);
        let mut sink = MemorySink::default();

        let result = pipeline.run(&names(&["Atlantis", "Lemuria"]), &mut sink).await;
        assert!(matches!(result, Err(PipelineError::EmptyBatch { requested: 2 })));
        assert!(sink.rows.is_empty());
        assert_eq!(pipeline.source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_city_list_is_empty_batch() {
        let pipeline = Pipeline::new(CannedSource::default(), 4);
        let mut sink = MemorySink::default();

        let result = pipeline.run(&[], &mut sink).await;
        assert!(matches!(result, Err(PipelineError::EmptyBatch { requested: 0 })));
        assert_eq!(pipeline.source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cities_without_daytime_data_cannot_win() {
        let source = CannedSource::default()
            .with_city("Night", &[&[(2, 40.0, SkyCondition::Clear)]])
            .with_city("Empty", &[]);

        let pipeline = Pipeline::new(source, 4);
        let mut sink = MemorySink::default();
        let result = pipeline.run(&names(&["Night", "Empty"]), &mut sink).await;

        assert!(matches!(result, Err(PipelineError::NoRankableCity)));
        // Rows are still persisted for every reduced city
        assert_eq!(sink.rows.len(), 2);
        assert!(sink.rows.iter().all(|r| r.avg_temp.is_none()));
    }
}
