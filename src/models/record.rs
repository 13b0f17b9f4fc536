//! Stored weather record model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::WeatherReport;

/// A persisted weather lookup.
///
/// `temperature_min`, `temperature_max` and `description` are first-class
/// columns derived at write time from the weather payload; `weather_data`
/// keeps the full report as opaque JSON text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WeatherRecord {
    pub id: i64,
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub description: Option<String>,
    pub weather_data: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a record
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewWeatherRecord {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "weatherData")]
    pub weather: WeatherReport,
}

/// Partial record update; every updatable attribute is spelled out.
/// Coordinates are only applied when both are present.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherRecordUpdate {
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "weatherData")]
    pub weather: Option<WeatherReport>,
}

impl WeatherRecordUpdate {
    /// True when no field is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.location.is_none()
            && self.latitude.is_none()
            && self.longitude.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.weather.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_is_empty() {
        let update = WeatherRecordUpdate::default();
        assert!(update.is_empty());

        let update = WeatherRecordUpdate {
            location: Some("Berlin".to_string()),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_update_deserializes_camel_case() {
        let update: WeatherRecordUpdate =
            serde_json::from_str(r#"{"startDate": "2024-05-01", "endDate": "2024-05-03"}"#)
                .unwrap();
        assert_eq!(update.start_date, "2024-05-01".parse().ok());
        assert_eq!(update.end_date, "2024-05-03".parse().ok());
        assert!(update.location.is_none());
    }
}
