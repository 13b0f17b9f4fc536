//! Weather API client for the OpenWeatherMap integration
//!
//! This module provides HTTP client functionality for retrieving forecast
//! and historical weather feeds with retry logic and error handling. The
//! feed items deserialize straight into [`WeatherSample`]s for aggregation.

use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::Result;
use crate::config::WeatherConfig;
use crate::error::WeatherVaultError;
use crate::models::WeatherSample;

/// Weather API client for OpenWeatherMap
#[derive(Debug)]
pub struct WeatherApiClient {
    /// HTTP client with retry middleware
    http: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    history_base_url: String,
}

/// Envelope of both the forecast and the history feed
#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    list: Vec<WeatherSample>,
}

impl WeatherApiClient {
    /// Create a new weather API client
    pub fn new(config: &WeatherConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| WeatherVaultError::config("Missing weather API key"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("WeatherVault/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WeatherVaultError::api(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.clone(),
            history_base_url: config.history_base_url.clone(),
        })
    }

    /// Get the 5-day/3-hour forecast feed for a coordinate pair
    #[instrument(skip(self))]
    pub async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<Vec<WeatherSample>> {
        let url = format!(
            "{}/forecast?lat={lat}&lon={lon}&units=metric&appid={}",
            self.base_url, self.api_key
        );

        let samples = self.fetch_feed(&url).await?;
        info!("Retrieved {} forecast samples", samples.len());
        Ok(samples)
    }

    /// Get the hourly history feed between two Unix timestamps
    #[instrument(skip(self))]
    pub async fn fetch_history(
        &self,
        lat: f64,
        lon: f64,
        start: i64,
        end: i64,
    ) -> Result<Vec<WeatherSample>> {
        let url = format!(
            "{}/history/city?lat={lat}&lon={lon}&type=hour&start={start}&end={end}&units=metric&appid={}",
            self.history_base_url, self.api_key
        );

        let samples = self.fetch_feed(&url).await?;
        info!("Retrieved {} historical samples", samples.len());
        Ok(samples)
    }

    async fn fetch_feed(&self, url: &str) -> Result<Vec<WeatherSample>> {
        debug!("Requesting weather feed");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherVaultError::api(format!("Weather request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherVaultError::api(format!(
                "Weather API returned status {status}"
            )));
        }

        let feed: FeedResponse = response
            .json()
            .await
            .map_err(|e| WeatherVaultError::api(format!("Failed to parse weather response: {e}")))?;

        Ok(feed.list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> WeatherConfig {
        WeatherConfig {
            api_key: Some("test_api_key_123".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = WeatherApiClient::new(&WeatherConfig::default()).unwrap_err();
        assert!(matches!(err, WeatherVaultError::Config { .. }));

        assert!(WeatherApiClient::new(&config_with_key()).is_ok());
    }

    #[test]
    fn test_feed_deserializes_partial_samples() {
        let body = r#"{
            "list": [
                {
                    "dt": 1715331600,
                    "main": {"temp": 15.2, "temp_min": 12.0, "temp_max": 18.0},
                    "weather": [{"description": "scattered clouds", "icon": "03d"}]
                },
                {"dt": 1715342400}
            ]
        }"#;

        let feed: FeedResponse = serde_json::from_str(body).unwrap();
        assert_eq!(feed.list.len(), 2);
        assert_eq!(feed.list[0].main.as_ref().unwrap().temp, 15.2);
        // malformed samples survive parsing; the aggregator rejects them
        assert!(feed.list[1].main.is_none());
        assert!(feed.list[1].weather.is_empty());
    }
}
