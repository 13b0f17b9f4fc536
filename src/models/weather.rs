//! Weather sample and forecast models

use serde::{Deserialize, Serialize};

/// One sub-daily point from the upstream weather feed.
///
/// `main` and `weather` mirror the provider's wire shape; a sample missing
/// either block is malformed and rejected during aggregation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WeatherSample {
    /// Unix timestamp of the observation (UTC seconds)
    pub dt: i64,
    /// Temperature block
    #[serde(default)]
    pub main: Option<SampleMain>,
    /// Condition list; the first entry is the representative one
    #[serde(default)]
    pub weather: Vec<SampleCondition>,
}

/// Temperature readings of a single sample
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampleMain {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// Condition text and icon code of a single sample
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SampleCondition {
    pub description: String,
    pub icon: String,
}

impl WeatherSample {
    /// Build a well-formed sample
    #[must_use]
    pub fn new(dt: i64, temp: f64, temp_min: f64, temp_max: f64, description: &str, icon: &str) -> Self {
        Self {
            dt,
            main: Some(SampleMain {
                temp,
                temp_min,
                temp_max,
            }),
            weather: vec![SampleCondition {
                description: description.to_string(),
                icon: icon.to_string(),
            }],
        }
    }
}

/// Snapshot used as the "current conditions" block of a report
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
    pub icon: String,
}

/// One aggregated calendar day
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DailyForecastEntry {
    /// Timestamp of the first sample folded into this day
    pub dt: i64,
    /// UTC calendar date key, `YYYY-MM-DD`
    pub date: String,
    pub temp_min: f64,
    pub temp_max: f64,
    pub description: String,
    pub icon: String,
}

/// Full result of one weather lookup; also the payload persisted on a record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherReport {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub current: Option<CurrentConditions>,
    pub forecast: Vec<DailyForecastEntry>,
}
