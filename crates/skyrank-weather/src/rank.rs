//! Concurrent "best of N" selection over reduced cities.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;

use crate::types::{CityStat, RankableCity};

/// Holds the best city seen so far.
///
/// Candidates are projected in parallel tasks; every comparison goes through
/// a single lock. `None` means nothing has been ranked yet.
#[derive(Debug, Default)]
pub struct Ranker {
    best: Mutex<Option<RankableCity>>,
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current best with `candidate` if it is strictly better.
    ///
    /// Returns whether the candidate took the lead. On a full tie the
    /// incumbent stays.
    pub fn compare(&self, candidate: RankableCity) -> bool {
        let mut best = self.best.lock();
        let leads = match best.as_ref() {
            None => true,
            Some(current) => {
                tracing::debug!("Comparing {} with {}", candidate, current);
                candidate.is_better_than(current)
            }
        };

        if leads {
            tracing::debug!("Best so far: {}", candidate);
            *best = Some(candidate);
        }
        leads
    }

    /// Snapshot of the current best
    pub fn best(&self) -> Option<RankableCity> {
        self.best.lock().clone()
    }

    /// Compare every city in its own task and return the winner.
    ///
    /// Cities without daytime data are skipped. Returns `None` when no city
    /// could be compared.
    pub async fn rank(self: &Arc<Self>, cities: &[CityStat]) -> Option<RankableCity> {
        let mut set = JoinSet::new();
        for city in cities {
            let ranker = Arc::clone(self);
            let city = city.clone();
            set.spawn(async move {
                match city.rankable() {
                    Some(candidate) => {
                        ranker.compare(candidate);
                    }
                    None => tracing::debug!("Skipping {}: no daytime data", city.city),
                }
            });
        }

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Ranking task failed: {}", e);
            }
        }

        let best = self.best();
        match &best {
            Some(city) => tracing::info!("Best city: {}", city),
            None => tracing::info!("No city could be ranked"),
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunningAverage;

    fn city(name: &str, temp: f64, dry: f64) -> CityStat {
        CityStat {
            city: name.to_string(),
            days: Vec::new(),
            average: RunningAverage::Set { temp, dry },
        }
    }

    fn unset(name: &str) -> CityStat {
        CityStat {
            city: name.to_string(),
            days: Vec::new(),
            average: RunningAverage::Unset,
        }
    }

    #[test]
    fn test_compare_replaces_only_when_strictly_better() {
        let ranker = Ranker::new();
        assert_eq!(ranker.best(), None);

        assert!(ranker.compare(RankableCity::new("A", 17.7, 7.0)));
        assert!(ranker.compare(RankableCity::new("B", 17.7, 9.0)));
        assert!(!ranker.compare(RankableCity::new("C", 13.1, 0.0)));
        assert!(!ranker.compare(RankableCity::new("D", 17.7, 9.0)));

        assert_eq!(ranker.best().map(|c| c.name), Some("B".to_string()));
    }

    #[tokio::test]
    async fn test_rank_temperature_tie_broken_by_dry_hours() {
        let ranker = Arc::new(Ranker::new());
        let cities = vec![
            city("A", 17.7, 7.0),
            city("B", 17.7, 9.0),
            city("C", 13.1, 0.0),
        ];

        let best = ranker.rank(&cities).await;
        assert_eq!(best, Some(RankableCity::new("B", 17.7, 9.0)));
    }

    #[tokio::test]
    async fn test_rank_independent_of_input_order() {
        let cities = vec![
            city("Paris", 21.2, 3.0),
            city("Cairo", 31.5, 11.0),
            city("London", 14.9, 2.5),
            city("Rome", 31.5, 10.0),
        ];

        for rotation in 0..cities.len() {
            let mut ordered = cities.clone();
            ordered.rotate_left(rotation);
            let ranker = Arc::new(Ranker::new());
            let best = ranker.rank(&ordered).await;
            assert_eq!(best.map(|c| c.name), Some("Cairo".to_string()));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rank_many_cities_in_parallel() {
        let cities: Vec<CityStat> = (0..200u32)
            .map(|i| city(&format!("City{}", i), f64::from(i % 50), f64::from(i)))
            .collect();

        let ranker = Arc::new(Ranker::new());
        let best = ranker.rank(&cities).await;
        // temp 49 occurs for i = 49, 99, 149, 199; most dry hours wins
        assert_eq!(best.map(|c| c.name), Some("City199".to_string()));
    }

    #[tokio::test]
    async fn test_rank_skips_cities_without_data() {
        let ranker = Arc::new(Ranker::new());
        let cities = vec![unset("Nowhere"), city("Kazan", -2.0, 1.0)];

        let best = ranker.rank(&cities).await;
        assert_eq!(best.map(|c| c.name), Some("Kazan".to_string()));
    }

    #[tokio::test]
    async fn test_rank_empty_input_is_unranked() {
        let ranker = Arc::new(Ranker::new());
        assert_eq!(ranker.rank(&[]).await, None);
        assert_eq!(ranker.rank(&[unset("Nowhere")]).await, None);
        assert_eq!(ranker.best(), None);
    }

    #[tokio::test]
    async fn test_separate_rankers_do_not_share_state() {
        let warm = Arc::new(Ranker::new());
        let cold = Arc::new(Ranker::new());

        warm.rank(&[city("Cairo", 31.5, 11.0)]).await;
        cold.rank(&[city("Novosibirsk", -10.0, 4.0)]).await;

        assert_eq!(warm.best().map(|c| c.name), Some("Cairo".to_string()));
        assert_eq!(cold.best().map(|c| c.name), Some("Novosibirsk".to_string()));
    }
}
