//! WeatherVault - weather lookup, record keeping and export
//!
//! This library provides the core functionality for daily forecast
//! aggregation, weather record persistence and export serialization,
//! wrapped in a small REST layer.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod forecast;
pub mod geocode;
pub mod models;
pub mod store;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use api::AppState;
pub use config::WeatherVaultConfig;
pub use error::WeatherVaultError;
pub use export::{Export, ExportFormat, export_records};
pub use forecast::{HistoricalSummary, aggregate_daily, aggregate_historical};
pub use geocode::GeocodingClient;
pub use models::{DailyForecastEntry, WeatherRecord, WeatherReport, WeatherSample};
pub use store::RecordStore;
pub use weather::WeatherApiClient;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, WeatherVaultError>;
