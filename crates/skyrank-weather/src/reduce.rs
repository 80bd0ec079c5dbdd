//! Per-day and per-city reduction of hourly forecasts.
//!
//! Only daytime hours count. Days are scanned in hour order: hours before
//! [`DAY_START_HOUR`] are skipped and the scan stops at the first hour past
//! [`DAY_END_HOUR`]. An out-of-order daytime hour that follows a late hour is
//! therefore dropped; sources must deliver hours ascending.

use tokio::task::JoinSet;

use crate::types::{round1, CityForecast, CityStat, DayRecord, DayStat, RunningAverage};

/// First hour of the daytime window
pub const DAY_START_HOUR: u8 = 9;
/// Last hour of the daytime window
pub const DAY_END_HOUR: u8 = 19;

/// Reduce a day's hours to its daytime mean temperature and dry-hour count
pub fn reduce_day(day: &DayRecord) -> DayStat {
    let mut sum_temp = 0.0;
    let mut hours = 0u32;
    let mut dry_hours = 0u32;

    for hour in &day.hours {
        if hour.hour < DAY_START_HOUR {
            continue;
        }
        if hour.hour > DAY_END_HOUR {
            break;
        }
        tracing::trace!(
            "{} {:02}h: {} {}",
            day.date,
            hour.hour,
            hour.temperature,
            hour.condition.description()
        );
        sum_temp += hour.temperature;
        hours += 1;
        if hour.condition.is_dry() {
            dry_hours += 1;
        }
    }

    if hours == 0 {
        return DayStat::no_data(day.date);
    }

    DayStat {
        date: day.date,
        avg_temp: round1(sum_temp / f64::from(hours)),
        dry_hours,
    }
}

/// Fold one day into a city's running average.
///
/// Days without data leave the state untouched. The first real day seeds
/// the average; each later day is averaged pairwise with the current value.
pub fn fold_city_average(state: RunningAverage, day: &DayStat) -> RunningAverage {
    if day.is_no_data() {
        return state;
    }

    let day_dry = f64::from(day.dry_hours);
    match state {
        RunningAverage::Unset => RunningAverage::Set {
            temp: day.avg_temp,
            dry: day_dry,
        },
        RunningAverage::Set { temp, dry } => RunningAverage::Set {
            temp: (temp + day.avg_temp) / 2.0,
            dry: (dry + day_dry) / 2.0,
        },
    }
}

/// Reduce every day of a city, then fold them in day order.
///
/// Each call starts from its own [`RunningAverage::Unset`].
pub fn reduce_city(forecast: &CityForecast) -> CityStat {
    tracing::debug!("Reducing {} days for {}", forecast.days.len(), forecast.city);

    let days: Vec<DayStat> = forecast.days.iter().map(reduce_day).collect();

    let average = days
        .iter()
        .fold(RunningAverage::Unset, fold_city_average)
        .rounded();

    match average {
        RunningAverage::Unset => {
            tracing::info!("{} has no daytime data in any day", forecast.city);
        }
        RunningAverage::Set { temp, dry } => {
            tracing::info!("Reduced {}: avg_temp = {}, avg_dry = {}", forecast.city, temp, dry);
        }
    }

    CityStat {
        city: forecast.city.clone(),
        days,
        average,
    }
}

/// Reduce all cities in parallel, returning results in input order
pub async fn reduce_all(forecasts: Vec<CityForecast>) -> Vec<CityStat> {
    let mut set = JoinSet::new();
    for (index, forecast) in forecasts.into_iter().enumerate() {
        set.spawn_blocking(move || (index, reduce_city(&forecast)));
    }

    let mut reduced = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(entry) => reduced.push(entry),
            Err(e) => tracing::error!("City reduction task failed: {}", e),
        }
    }

    reduced.sort_by_key(|(index, _)| *index);
    reduced.into_iter().map(|(_, stat)| stat).collect()
}
