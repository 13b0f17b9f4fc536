//! Data models for weather lookups and stored records

pub mod location;
pub mod record;
pub mod weather;

pub use location::Location;
pub use record::{NewWeatherRecord, WeatherRecord, WeatherRecordUpdate};
pub use weather::{
    CurrentConditions, DailyForecastEntry, SampleCondition, SampleMain, WeatherReport,
    WeatherSample,
};
