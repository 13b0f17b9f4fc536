use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use weathervault::api::AppState;
use weathervault::config::WeatherVaultConfig;
use weathervault::geocode::GeocodingClient;
use weathervault::store::RecordStore;
use weathervault::weather::WeatherApiClient;
use weathervault::web;

#[tokio::main]
async fn main() -> Result<()> {
    let config = WeatherVaultConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    tracing::info!("Starting WeatherVault v{}", weathervault::VERSION);

    let store = RecordStore::open(Path::new(&config.database.path))
        .with_context(|| format!("Failed to open record database at {}", config.database.path))?;
    let weather = WeatherApiClient::new(&config.weather)?;
    let geocoding = GeocodingClient::new(&config.geocoding)?;

    let state = AppState::new(store, weather, geocoding);
    web::run(config.server, state).await
}
