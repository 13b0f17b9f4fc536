//! Geocoding via the Google Maps Geocoding API
//!
//! Forward geocoding resolves a free-form query to coordinates and a
//! formatted address; reverse geocoding turns coordinates back into a
//! display name, with the caller falling back to rendering the raw
//! coordinates when no name is available.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::Result;
use crate::config::GeocodingConfig;
use crate::error::WeatherVaultError;
use crate::models::Location;

/// Geocoding client for the Google Maps API
#[derive(Debug)]
pub struct GeocodingClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: GeometryLocation,
}

#[derive(Debug, Deserialize)]
struct GeometryLocation {
    lat: f64,
    lng: f64,
}

impl GeocodingClient {
    /// Create a new geocoding client
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WeatherVaultError::config("Missing geocoding API key"))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("WeatherVault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherVaultError::api(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
        })
    }

    /// Resolve a place name or address to coordinates. First result wins.
    #[instrument(skip(self))]
    pub async fn geocode(&self, query: &str) -> Result<Location> {
        let url = format!(
            "{}?address={}&key={}",
            self.base_url,
            urlencoding::encode(query),
            self.api_key
        );

        let response: GeocodeResponse = self.get_json(&url).await?;
        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| WeatherVaultError::not_found(format!("Location not found: {query}")))?;

        debug!(
            "Geocoded '{}' to ({:.4}, {:.4})",
            query, result.geometry.location.lat, result.geometry.location.lng
        );

        Ok(Location::new(
            result.geometry.location.lat,
            result.geometry.location.lng,
            result.formatted_address,
        ))
    }

    /// Resolve coordinates to a formatted address.
    /// Returns `None` on any failure so the caller can fall back to
    /// rendering the raw coordinates.
    #[instrument(skip(self))]
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Option<String> {
        let url = format!("{}?latlng={lat},{lon}&key={}", self.base_url, self.api_key);

        match self.get_json::<GeocodeResponse>(&url).await {
            Ok(response) => response
                .results
                .into_iter()
                .next()
                .map(|result| result.formatted_address),
            Err(e) => {
                debug!("Reverse geocoding failed: {e}");
                None
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherVaultError::api(format!("Geocoding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherVaultError::api(format!(
                "Geocoding API returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WeatherVaultError::api(format!("Failed to parse geocoding response: {e}")))
    }
}
