use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Sky condition vocabulary reported by the forecast provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SkyCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Overcast,
    Drizzle,
    LightRain,
    Rain,
    ModerateRain,
    HeavyRain,
    ContinuousHeavyRain,
    Showers,
    WetSnow,
    LightSnow,
    Snow,
    SnowShowers,
    Hail,
    Thunderstorm,
    ThunderstormWithRain,
    ThunderstormWithHail,
    #[default]
    #[serde(other)]
    Unknown,
}

impl SkyCondition {
    /// True for the non-precipitating conditions
    pub fn is_dry(&self) -> bool {
        matches!(
            self,
            Self::Clear | Self::PartlyCloudy | Self::Cloudy | Self::Overcast
        )
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Overcast => "Overcast",
            Self::Drizzle => "Drizzle",
            Self::LightRain => "Light Rain",
            Self::Rain => "Rain",
            Self::ModerateRain => "Moderate Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::ContinuousHeavyRain => "Continuous Heavy Rain",
            Self::Showers => "Showers",
            Self::WetSnow => "Wet Snow",
            Self::LightSnow => "Light Snow",
            Self::Snow => "Snow",
            Self::SnowShowers => "Snow Showers",
            Self::Hail => "Hail",
            Self::Thunderstorm => "Thunderstorm",
            Self::ThunderstormWithRain => "Thunderstorm with Rain",
            Self::ThunderstormWithHail => "Thunderstorm with Hail",
            Self::Unknown => "Unknown",
        }
    }
}

/// One hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourRecord {
    /// Hour of day, 0..=23
    pub hour: u8,
    pub temperature: f64,
    pub condition: SkyCondition,
}

impl HourRecord {
    pub fn new(hour: u8, temperature: f64, condition: SkyCondition) -> Self {
        Self {
            hour,
            temperature,
            condition,
        }
    }
}

/// All hourly entries for one calendar day, ascending by hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub hours: Vec<HourRecord>,
}

/// A city's multi-day forecast as returned by a [`ForecastSource`](crate::ForecastSource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityForecast {
    pub city: String,
    pub days: Vec<DayRecord>,
}

/// Daytime summary of a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayStat {
    pub date: NaiveDate,
    /// Mean daytime temperature at one decimal, `0.0` when there was no data
    pub avg_temp: f64,
    pub dry_hours: u32,
}

impl DayStat {
    /// The "no daytime data" marker for `date`
    pub fn no_data(date: NaiveDate) -> Self {
        Self {
            date,
            avg_temp: 0.0,
            dry_hours: 0,
        }
    }

    /// Whether this day carries the no-data marker.
    ///
    /// A real day averaging exactly 0.0 is indistinguishable from the marker.
    pub fn is_no_data(&self) -> bool {
        self.avg_temp == 0.0
    }
}

/// Pairwise running average over a city's days.
///
/// Each new day is averaged with the previous running value, so later days
/// weigh more than earlier ones. This is not an arithmetic mean.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RunningAverage {
    /// No day with data has been folded yet
    #[default]
    Unset,
    Set { temp: f64, dry: f64 },
}

impl RunningAverage {
    pub fn temp(&self) -> Option<f64> {
        match self {
            Self::Unset => None,
            Self::Set { temp, .. } => Some(*temp),
        }
    }

    pub fn dry(&self) -> Option<f64> {
        match self {
            Self::Unset => None,
            Self::Set { dry, .. } => Some(*dry),
        }
    }

    /// Both components rounded to one decimal
    pub fn rounded(self) -> Self {
        match self {
            Self::Unset => Self::Unset,
            Self::Set { temp, dry } => Self::Set {
                temp: round1(temp),
                dry: round1(dry),
            },
        }
    }
}

/// Reduced forecast for one city
#[derive(Debug, Clone, PartialEq)]
pub struct CityStat {
    pub city: String,
    pub days: Vec<DayStat>,
    pub average: RunningAverage,
}

impl CityStat {
    pub fn avg_temp(&self) -> Option<f64> {
        self.average.temp()
    }

    pub fn avg_dry(&self) -> Option<f64> {
        self.average.dry()
    }

    /// Whether no day of this city had daytime data
    pub fn has_no_valid_days(&self) -> bool {
        self.average == RunningAverage::Unset
    }

    /// Project onto the fields used for ranking; `None` when unset
    pub fn rankable(&self) -> Option<RankableCity> {
        match self.average {
            RunningAverage::Unset => None,
            RunningAverage::Set { temp, dry } => Some(RankableCity {
                name: self.city.clone(),
                temp,
                dry,
            }),
        }
    }
}

/// The part of a [`CityStat`] that ranking compares
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankableCity {
    pub name: String,
    pub temp: f64,
    pub dry: f64,
}

impl RankableCity {
    pub fn new(name: impl Into<String>, temp: f64, dry: f64) -> Self {
        Self {
            name: name.into(),
            temp,
            dry,
        }
    }

    /// Strictly warmer wins; on equal temperature strictly more dry hours wins
    pub fn is_better_than(&self, other: &RankableCity) -> bool {
        self.temp
            .total_cmp(&other.temp)
            .then(self.dry.total_cmp(&other.dry))
            .is_gt()
    }
}

impl std::fmt::Display for RankableCity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: temp={}, dry={}", self.name, self.temp, self.dry)
    }
}

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
