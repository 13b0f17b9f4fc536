//! REST handlers for weather lookup, record CRUD and export

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use crate::{
    error::WeatherVaultError,
    export::{self, ExportFormat},
    forecast,
    geocode::GeocodingClient,
    models::{Location, NewWeatherRecord, WeatherRecord, WeatherRecordUpdate, WeatherReport},
    store::RecordStore,
    weather::WeatherApiClient,
};

/// Days returned for a current-mode lookup
const FORECAST_DAYS: usize = 5;

/// Shared handler state, constructed once at startup and passed in
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub weather: Arc<WeatherApiClient>,
    pub geocoding: Arc<GeocodingClient>,
}

impl AppState {
    #[must_use]
    pub fn new(store: RecordStore, weather: WeatherApiClient, geocoding: GeocodingClient) -> Self {
        Self {
            store: Arc::new(store),
            weather: Arc::new(weather),
            geocoding: Arc::new(geocoding),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/weather", get(get_weather))
        .route("/records", get(list_records).post(create_record))
        .route("/records/export", post(export_records))
        .route(
            "/records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(state)
}

/// Crate error wrapped for axum responses
pub struct ApiError(WeatherVaultError);

impl From<WeatherVaultError> for ApiError {
    fn from(err: WeatherVaultError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            WeatherVaultError::Validation { .. }
            | WeatherVaultError::InvalidSample { .. }
            | WeatherVaultError::UnsupportedFormat { .. } => StatusCode::BAD_REQUEST,
            WeatherVaultError::NotFound { .. } => StatusCode::NOT_FOUND,
            WeatherVaultError::Api { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        (
            status,
            Json(ErrorBody {
                error: self.0.user_message(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherQuery {
    pub location: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

fn default_mode() -> String {
    "current".to_string()
}

#[instrument(skip(state))]
async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> ApiResult<Json<WeatherReport>> {
    if query.location.trim().is_empty() {
        return Err(WeatherVaultError::validation("Location is required").into());
    }

    let report = match query.mode.as_str() {
        "current" => {
            let location = resolve_location(&state.geocoding, &query.location).await?;
            let samples = state
                .weather
                .fetch_forecast(location.latitude, location.longitude)
                .await?;

            let current = samples
                .first()
                .map(forecast::current_conditions)
                .transpose()?;
            let daily = forecast::aggregate_daily(&samples)?;

            WeatherReport {
                location: location.name,
                latitude: location.latitude,
                longitude: location.longitude,
                current,
                forecast: daily.into_iter().take(FORECAST_DAYS).collect(),
            }
        }
        "range" => {
            let (start_date, end_date) = match (query.start_date, query.end_date) {
                (Some(start), Some(end)) => (start, end),
                _ => {
                    return Err(WeatherVaultError::validation(
                        "Start and end dates are required for range mode",
                    )
                    .into());
                }
            };
            if end_date < start_date {
                return Err(
                    WeatherVaultError::validation("End date must not precede start date").into(),
                );
            }

            let location = resolve_location(&state.geocoding, &query.location).await?;
            let start = start_date.and_time(NaiveTime::MIN).and_utc().timestamp();
            let end = end_date.and_time(NaiveTime::MIN).and_utc().timestamp();

            let samples = state
                .weather
                .fetch_history(location.latitude, location.longitude, start, end)
                .await?;
            let summary = forecast::aggregate_historical(&samples)?;

            WeatherReport {
                location: location.name,
                latitude: location.latitude,
                longitude: location.longitude,
                current: summary.current,
                forecast: summary.forecast,
            }
        }
        other => {
            return Err(WeatherVaultError::validation(format!("Invalid mode: {other}")).into());
        }
    };

    Ok(Json(report))
}

/// A `lat,lon` pair is used directly and reverse-geocoded for a display
/// name; anything else is forward-geocoded.
async fn resolve_location(geocoding: &GeocodingClient, input: &str) -> ApiResult<Location> {
    if let Some((lat, lon)) = parse_coordinates(input) {
        let name = geocoding
            .reverse_geocode(lat, lon)
            .await
            .unwrap_or_else(|| format!("{lat}, {lon}"));
        return Ok(Location::new(lat, lon, name));
    }

    Ok(geocoding.geocode(input).await?)
}

fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
    let (lat, lon) = input.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if !((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)) {
        return None;
    }
    Some((lat, lon))
}

async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<WeatherRecord>>> {
    Ok(Json(state.store.list()?))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<WeatherRecord>> {
    let record = state
        .store
        .get(id)?
        .ok_or_else(|| WeatherVaultError::not_found(format!("Record {id} not found")))?;
    Ok(Json(record))
}

#[derive(Serialize)]
struct RecordResponse {
    success: bool,
    record: WeatherRecord,
}

#[instrument(skip(state, body), fields(location = %body.location))]
async fn create_record(
    State(state): State<AppState>,
    Json(body): Json<NewWeatherRecord>,
) -> ApiResult<(StatusCode, Json<RecordResponse>)> {
    if body.location.trim().is_empty() {
        return Err(WeatherVaultError::validation("Location is required").into());
    }
    if body.end_date < body.start_date {
        return Err(WeatherVaultError::validation("End date must not precede start date").into());
    }

    let record = state.store.insert(&body)?;
    Ok((
        StatusCode::CREATED,
        Json(RecordResponse {
            success: true,
            record,
        }),
    ))
}

#[instrument(skip(state, body))]
async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<WeatherRecordUpdate>,
) -> ApiResult<Json<RecordResponse>> {
    if body.is_empty() {
        return Err(WeatherVaultError::validation("No update data provided").into());
    }

    let record = state.store.update(id, &body)?;
    Ok(Json(RecordResponse {
        success: true,
        record,
    }))
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.store.delete(id)?;
    Ok(Json(DeleteResponse { success: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub record_ids: Vec<i64>,
    pub format: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportResponse {
    success: bool,
    content: String,
    filename: String,
    mime_type: String,
}

#[instrument(skip(state, body), fields(format = %body.format, count = body.record_ids.len()))]
async fn export_records(
    State(state): State<AppState>,
    Json(body): Json<ExportRequest>,
) -> ApiResult<Json<ExportResponse>> {
    if body.record_ids.is_empty() {
        return Err(WeatherVaultError::validation("No record IDs provided").into());
    }
    let format: ExportFormat = body.format.parse()?;

    let records = state.store.list_by_ids(&body.record_ids)?;
    if records.is_empty() {
        return Err(WeatherVaultError::not_found("No records found").into());
    }

    let export = export::export_records(&records, format)?;
    let filename = format!("weather_records_{}", Utc::now().format("%Y-%m-%d"));

    Ok(Json(ExportResponse {
        success: true,
        content: export.content,
        filename,
        mime_type: export.mime_type.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_coordinates("52.52, 13.405"), Some((52.52, 13.405)));
        assert_eq!(parse_coordinates("-33.9,151.2"), Some((-33.9, 151.2)));
        assert_eq!(parse_coordinates("Berlin"), None);
        assert_eq!(parse_coordinates("Berlin, Germany"), None);
        // out-of-range values are treated as a place name, not coordinates
        assert_eq!(parse_coordinates("120.0, 13.0"), None);
    }

    #[test]
    fn test_weather_query_defaults_to_current_mode() {
        let query: WeatherQuery =
            serde_json::from_str(r#"{"location": "Berlin"}"#).unwrap();
        assert_eq!(query.mode, "current");
        assert!(query.start_date.is_none());
    }
}
