//! Local SQLite storage for weather records.
//!
//! The store is constructed once and handed to the REST layer; nothing in
//! here is global. The record schema keeps first-class temperature and
//! description columns next to the opaque JSON payload, all derived from the
//! weather report at write time.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::Result;
use crate::error::WeatherVaultError;
use crate::models::{NewWeatherRecord, WeatherRecord, WeatherRecordUpdate, WeatherReport};

const RECORD_COLUMNS: &str = "id, location, latitude, longitude, start_date, end_date, \
     temperature_min, temperature_max, description, weather_data, created_at, updated_at";

/// SQLite-backed store for weather records
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open or create the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Open a throwaway in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.lock().execute_batch(
            "CREATE TABLE IF NOT EXISTS weather_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                location TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                temperature_min REAL,
                temperature_max REAL,
                description TEXT,
                weather_data TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_weather_records_created
                ON weather_records(created_at);",
        )?;
        Ok(())
    }

    /// Insert a new record, deriving temperature and description columns
    /// from the weather payload
    pub fn insert(&self, new: &NewWeatherRecord) -> Result<WeatherRecord> {
        let derived = DerivedFields::from_report(&new.weather)?;
        let now = Utc::now();

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO weather_records
                (location, latitude, longitude, start_date, end_date,
                 temperature_min, temperature_max, description, weather_data,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                new.location,
                new.latitude,
                new.longitude,
                new.start_date.to_string(),
                new.end_date.to_string(),
                derived.temperature_min,
                derived.temperature_max,
                derived.description,
                derived.payload,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        debug!("Created record {id} for {}", new.location);
        self.get(id)?
            .ok_or_else(|| WeatherVaultError::not_found(format!("Record {id} not found")))
    }

    /// All records, newest first
    pub fn list(&self) -> Result<Vec<WeatherRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM weather_records ORDER BY created_at DESC, id DESC"
        ))?;

        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Fetch a record by id
    pub fn get(&self, id: i64) -> Result<Option<WeatherRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM weather_records WHERE id = ?1"
        ))?;

        let record = stmt.query_row([id], row_to_record).optional()?;
        Ok(record)
    }

    /// Fetch the records whose ids appear in `ids`, ordered by id.
    /// Unknown ids are skipped.
    pub fn list_by_ids(&self, ids: &[i64]) -> Result<Vec<WeatherRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(",");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM weather_records WHERE id IN ({placeholders}) ORDER BY id"
        ))?;

        let records = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Apply a partial update, re-deriving temperature and description
    /// columns when a new weather payload is supplied
    pub fn update(&self, id: i64, update: &WeatherRecordUpdate) -> Result<WeatherRecord> {
        let mut record = self
            .get(id)?
            .ok_or_else(|| WeatherVaultError::not_found(format!("Record {id} not found")))?;

        if let Some(location) = &update.location {
            record.location = location.clone();
        }
        // coordinates only move together
        if let (Some(latitude), Some(longitude)) = (update.latitude, update.longitude) {
            record.latitude = latitude;
            record.longitude = longitude;
        }
        if let Some(start_date) = update.start_date {
            record.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            record.end_date = end_date;
        }
        if let Some(report) = &update.weather {
            let derived = DerivedFields::from_report(report)?;
            if derived.temperature_min.is_some() {
                record.temperature_min = derived.temperature_min;
            }
            if derived.temperature_max.is_some() {
                record.temperature_max = derived.temperature_max;
            }
            if derived.description.is_some() {
                record.description = derived.description;
            }
            record.weather_data = Some(derived.payload);
        }
        record.updated_at = Utc::now();

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE weather_records SET
                location = ?1, latitude = ?2, longitude = ?3,
                start_date = ?4, end_date = ?5,
                temperature_min = ?6, temperature_max = ?7,
                description = ?8, weather_data = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                record.location,
                record.latitude,
                record.longitude,
                record.start_date.to_string(),
                record.end_date.to_string(),
                record.temperature_min,
                record.temperature_max,
                record.description,
                record.weather_data,
                record.updated_at.to_rfc3339(),
                id,
            ],
        )?;

        debug!("Updated record {id}");
        Ok(record)
    }

    /// Delete a record by id
    pub fn delete(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM weather_records WHERE id = ?1", [id])?;

        if deleted == 0 {
            return Err(WeatherVaultError::not_found(format!(
                "Record {id} not found"
            )));
        }
        debug!("Deleted record {id}");
        Ok(())
    }
}

/// Columns derived from a weather report at write time
struct DerivedFields {
    temperature_min: Option<f64>,
    temperature_max: Option<f64>,
    description: Option<String>,
    payload: String,
}

impl DerivedFields {
    fn from_report(report: &WeatherReport) -> Result<Self> {
        let mut temperature_min: Option<f64> = None;
        let mut temperature_max: Option<f64> = None;
        for day in &report.forecast {
            temperature_min = Some(temperature_min.map_or(day.temp_min, |t| t.min(day.temp_min)));
            temperature_max = Some(temperature_max.map_or(day.temp_max, |t| t.max(day.temp_max)));
        }

        Ok(Self {
            temperature_min,
            temperature_max,
            description: report.current.as_ref().map(|c| c.description.clone()),
            payload: serde_json::to_string(report)?,
        })
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<WeatherRecord> {
    Ok(WeatherRecord {
        id: row.get(0)?,
        location: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        start_date: parse_date(&row.get::<_, String>(4)?, 4)?,
        end_date: parse_date(&row.get::<_, String>(5)?, 5)?,
        temperature_min: row.get(6)?,
        temperature_max: row.get(7)?,
        description: row.get(8)?,
        weather_data: row.get(9)?,
        created_at: parse_timestamp(&row.get::<_, String>(10)?, 10)?,
        updated_at: parse_timestamp(&row.get::<_, String>(11)?, 11)?,
    })
}

fn parse_date(text: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_timestamp(text: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CurrentConditions, DailyForecastEntry};

    fn report() -> WeatherReport {
        WeatherReport {
            location: "Berlin, Germany".to_string(),
            latitude: 52.52,
            longitude: 13.405,
            current: Some(CurrentConditions {
                temp: 15.2,
                temp_min: 12.0,
                temp_max: 18.0,
                description: "scattered clouds".to_string(),
                icon: "03d".to_string(),
            }),
            forecast: vec![
                DailyForecastEntry {
                    dt: 1_715_331_600,
                    date: "2024-05-10".to_string(),
                    temp_min: 8.5,
                    temp_max: 19.0,
                    description: "scattered clouds".to_string(),
                    icon: "03d".to_string(),
                },
                DailyForecastEntry {
                    dt: 1_715_418_000,
                    date: "2024-05-11".to_string(),
                    temp_min: 10.0,
                    temp_max: 16.5,
                    description: "light rain".to_string(),
                    icon: "10d".to_string(),
                },
            ],
        }
    }

    fn new_record() -> NewWeatherRecord {
        NewWeatherRecord {
            location: "Berlin, Germany".to_string(),
            latitude: 52.52,
            longitude: 13.405,
            start_date: "2024-05-10".parse().unwrap(),
            end_date: "2024-05-14".parse().unwrap(),
            weather: report(),
        }
    }

    #[test]
    fn test_insert_derives_columns() {
        let store = RecordStore::open_in_memory().unwrap();
        let record = store.insert(&new_record()).unwrap();

        assert_eq!(record.location, "Berlin, Germany");
        assert_eq!(record.temperature_min, Some(8.5));
        assert_eq!(record.temperature_max, Some(19.0));
        assert_eq!(record.description, Some("scattered clouds".to_string()));

        let payload: WeatherReport =
            serde_json::from_str(record.weather_data.as_deref().unwrap()).unwrap();
        assert_eq!(payload, report());
    }

    #[test]
    fn test_list_newest_first() {
        let store = RecordStore::open_in_memory().unwrap();
        let first = store.insert(&new_record()).unwrap();
        let second = store.insert(&new_record()).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, second.id);
        assert_eq!(records[1].id, first.id);
    }

    #[test]
    fn test_get_round_trips() {
        let store = RecordStore::open_in_memory().unwrap();
        let inserted = store.insert(&new_record()).unwrap();

        let fetched = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched, inserted);

        assert!(store.get(9999).unwrap().is_none());
    }

    #[test]
    fn test_list_by_ids_skips_unknown() {
        let store = RecordStore::open_in_memory().unwrap();
        let first = store.insert(&new_record()).unwrap();
        let _second = store.insert(&new_record()).unwrap();
        let third = store.insert(&new_record()).unwrap();

        let records = store.list_by_ids(&[first.id, third.id, 9999]).unwrap();
        let ids: Vec<i64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, third.id]);

        assert!(store.list_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_update_applies_only_provided_fields() {
        let store = RecordStore::open_in_memory().unwrap();
        let inserted = store.insert(&new_record()).unwrap();

        let update = WeatherRecordUpdate {
            location: Some("Hamburg, Germany".to_string()),
            // only one coordinate supplied, both keep their old values
            latitude: Some(53.55),
            ..Default::default()
        };
        let updated = store.update(inserted.id, &update).unwrap();

        assert_eq!(updated.location, "Hamburg, Germany");
        assert_eq!(updated.latitude, inserted.latitude);
        assert_eq!(updated.start_date, inserted.start_date);
        assert_eq!(updated.temperature_min, inserted.temperature_min);

        let fetched = store.get(inserted.id).unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[test]
    fn test_update_with_weather_rederives_columns() {
        let store = RecordStore::open_in_memory().unwrap();
        let inserted = store.insert(&new_record()).unwrap();

        let mut new_report = report();
        new_report.forecast[0].temp_min = -2.0;
        new_report.forecast[1].temp_max = 25.0;
        new_report.current.as_mut().unwrap().description = "heavy rain".to_string();

        let update = WeatherRecordUpdate {
            weather: Some(new_report),
            ..Default::default()
        };
        let updated = store.update(inserted.id, &update).unwrap();

        assert_eq!(updated.temperature_min, Some(-2.0));
        assert_eq!(updated.temperature_max, Some(25.0));
        assert_eq!(updated.description, Some("heavy rain".to_string()));
    }

    #[test]
    fn test_update_missing_record() {
        let store = RecordStore::open_in_memory().unwrap();
        let err = store
            .update(42, &WeatherRecordUpdate::default())
            .unwrap_err();
        assert!(matches!(err, WeatherVaultError::NotFound { .. }));
    }

    #[test]
    fn test_delete() {
        let store = RecordStore::open_in_memory().unwrap();
        let record = store.insert(&new_record()).unwrap();

        store.delete(record.id).unwrap();
        assert!(store.get(record.id).unwrap().is_none());

        let err = store.delete(record.id).unwrap_err();
        assert!(matches!(err, WeatherVaultError::NotFound { .. }));
    }

    #[test]
    fn test_empty_forecast_leaves_temperatures_null() {
        let store = RecordStore::open_in_memory().unwrap();
        let mut new = new_record();
        new.weather.forecast.clear();
        new.weather.current = None;

        let record = store.insert(&new).unwrap();
        assert_eq!(record.temperature_min, None);
        assert_eq!(record.temperature_max, None);
        assert_eq!(record.description, None);
    }
}
