//! Daily aggregation of sub-daily weather samples.
//!
//! Collapses a raw time-stepped feed (typically 3-hourly) into one entry per
//! calendar day. Grouping keys off the UTC calendar date of each sample; the
//! final dedup pass of [`aggregate_daily`] keys off the locally rendered date
//! of each group's representative timestamp. Near local midnight those two
//! views of a timestamp can disagree, which is why the dedup pass exists.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Local, Timelike};
use tracing::debug;

use crate::Result;
use crate::error::WeatherVaultError;
use crate::models::{CurrentConditions, DailyForecastEntry, SampleCondition, SampleMain, WeatherSample};

/// Result of aggregating a historical feed: the first raw sample doubles as
/// the "current conditions" snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoricalSummary {
    pub current: Option<CurrentConditions>,
    pub forecast: Vec<DailyForecastEntry>,
}

/// Reduce a forecast feed to one entry per distinct UTC calendar date.
///
/// Per day: running min/max over the samples' `temp`, the most frequent
/// condition text (first-encountered wins ties), and the icon of the first
/// sample whose local hour falls in 11..=13 (first sample's icon otherwise).
/// Output is sorted by each day's first-seen timestamp, then deduplicated on
/// the local rendering of that timestamp's date.
///
/// A sample without its `main` block or with an empty `weather` list aborts
/// the whole batch. An empty feed yields an empty list.
pub fn aggregate_daily(samples: &[WeatherSample]) -> Result<Vec<DailyForecastEntry>> {
    let mut entries = collect_days(samples, true)?;

    // Defensive: two UTC-keyed groups can render to the same local date when
    // a representative timestamp straddles a day boundary. Keep the first.
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(local_date_key(entry.dt)));

    Ok(entries)
}

/// Reduce a historical feed to per-day entries plus a snapshot of the first
/// raw sample as current conditions.
///
/// Same grouping as [`aggregate_daily`] but without the midday icon bias and
/// without the local-date dedup pass. `current` is `None` for an empty feed.
pub fn aggregate_historical(samples: &[WeatherSample]) -> Result<HistoricalSummary> {
    let forecast = collect_days(samples, false)?;
    let current = samples.first().map(current_conditions).transpose()?;

    Ok(HistoricalSummary { current, forecast })
}

/// Snapshot a single sample, failing on a malformed one
pub fn current_conditions(sample: &WeatherSample) -> Result<CurrentConditions> {
    let (main, condition) = sample_parts(sample)?;

    Ok(CurrentConditions {
        temp: main.temp,
        temp_min: main.temp_min,
        temp_max: main.temp_max,
        description: condition.description.clone(),
        icon: condition.icon.clone(),
    })
}

struct DayGroup {
    date: String,
    dt: i64,
    temp_min: f64,
    temp_max: f64,
    description: String,
    icon: String,
    midday_icon_locked: bool,
    /// Condition text occurrences in first-seen order
    condition_counts: Vec<(String, u32)>,
}

impl DayGroup {
    fn new(date: String, sample_dt: i64, main: &SampleMain, condition: &SampleCondition, midday_bias: bool) -> Self {
        let mut group = Self {
            date,
            dt: sample_dt,
            temp_min: main.temp,
            temp_max: main.temp,
            description: condition.description.clone(),
            icon: condition.icon.clone(),
            midday_icon_locked: false,
            condition_counts: vec![(condition.description.clone(), 1)],
        };
        if midday_bias && is_midday(sample_dt) {
            group.midday_icon_locked = true;
        }
        group
    }

    fn fold(&mut self, sample_dt: i64, main: &SampleMain, condition: &SampleCondition, midday_bias: bool) {
        self.temp_min = self.temp_min.min(main.temp);
        self.temp_max = self.temp_max.max(main.temp);

        match self
            .condition_counts
            .iter_mut()
            .find(|(text, _)| *text == condition.description)
        {
            Some((_, count)) => *count += 1,
            None => self
                .condition_counts
                .push((condition.description.clone(), 1)),
        }

        // Recompute the dominant condition; strict `>` keeps the earliest
        // entry on ties.
        let mut best_count = 0;
        for (text, count) in &self.condition_counts {
            if *count > best_count {
                best_count = *count;
                self.description = text.clone();
            }
        }

        if midday_bias && !self.midday_icon_locked && is_midday(sample_dt) {
            self.icon = condition.icon.clone();
            self.midday_icon_locked = true;
        }
    }

    fn into_entry(self) -> DailyForecastEntry {
        DailyForecastEntry {
            dt: self.dt,
            date: self.date,
            temp_min: self.temp_min,
            temp_max: self.temp_max,
            description: self.description,
            icon: self.icon,
        }
    }
}

fn collect_days(samples: &[WeatherSample], midday_bias: bool) -> Result<Vec<DailyForecastEntry>> {
    if samples.is_empty() {
        debug!("Empty sample list, producing empty day list");
    }

    let mut groups: HashMap<String, DayGroup> = HashMap::new();

    for sample in samples {
        let (main, condition) = sample_parts(sample)?;
        let date = utc_date_key(sample.dt)?;

        match groups.get_mut(&date) {
            Some(group) => group.fold(sample.dt, main, condition, midday_bias),
            None => {
                let group = DayGroup::new(date.clone(), sample.dt, main, condition, midday_bias);
                groups.insert(date, group);
            }
        }
    }

    let mut entries: Vec<DailyForecastEntry> =
        groups.into_values().map(DayGroup::into_entry).collect();
    entries.sort_by_key(|entry| entry.dt);

    Ok(entries)
}

fn sample_parts(sample: &WeatherSample) -> Result<(&SampleMain, &SampleCondition)> {
    let main = sample.main.as_ref().ok_or_else(|| {
        WeatherVaultError::invalid_sample(format!("sample at dt={} has no main block", sample.dt))
    })?;
    let condition = sample.weather.first().ok_or_else(|| {
        WeatherVaultError::invalid_sample(format!(
            "sample at dt={} has no weather conditions",
            sample.dt
        ))
    })?;
    Ok((main, condition))
}

/// UTC calendar date of a Unix timestamp, `YYYY-MM-DD`
fn utc_date_key(dt: i64) -> Result<String> {
    let instant = DateTime::from_timestamp(dt, 0).ok_or_else(|| {
        WeatherVaultError::invalid_sample(format!("timestamp {dt} is out of range"))
    })?;
    Ok(instant.format("%Y-%m-%d").to_string())
}

/// Local calendar date of a Unix timestamp, `YYYY-MM-DD`
fn local_date_key(dt: i64) -> String {
    DateTime::from_timestamp(dt, 0)
        .map(|instant| instant.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn is_midday(dt: i64) -> bool {
    DateTime::from_timestamp(dt, 0)
        .map(|instant| {
            let hour = instant.with_timezone(&Local).hour();
            (11..=13).contains(&hour)
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    /// Unix timestamp for a UTC wall-clock time
    fn utc_ts(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
            .single()
            .unwrap()
            .timestamp()
    }

    /// Unix timestamp for a local wall-clock time
    fn local_ts(year: i32, month: u32, day: u32, hour: u32) -> i64 {
        Local
            .with_ymd_and_hms(year, month, day, hour, 0, 0)
            .earliest()
            .unwrap()
            .timestamp()
    }

    fn sample(dt: i64, temp: f64, description: &str, icon: &str) -> WeatherSample {
        WeatherSample::new(dt, temp, temp - 1.0, temp + 1.0, description, icon)
    }

    #[test]
    fn test_single_day_min_max_and_dominant_condition() {
        let samples = vec![
            sample(utc_ts(2024, 5, 10, 3, 0), 10.0, "clear", "01d"),
            sample(utc_ts(2024, 5, 10, 6, 0), 15.0, "clear", "01d"),
            sample(utc_ts(2024, 5, 10, 9, 0), 8.0, "rain", "10d"),
        ];

        let entries = aggregate_daily(&samples).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].temp_min, 8.0);
        assert_eq!(entries[0].temp_max, 15.0);
        assert_eq!(entries[0].description, "clear");
        assert_eq!(entries[0].date, "2024-05-10");
        assert_eq!(entries[0].dt, utc_ts(2024, 5, 10, 3, 0));
    }

    #[test]
    fn test_one_entry_per_utc_date_sorted() {
        let samples = vec![
            sample(utc_ts(2024, 5, 11, 6, 0), 12.0, "clouds", "03d"),
            sample(utc_ts(2024, 5, 10, 6, 0), 10.0, "clear", "01d"),
            sample(utc_ts(2024, 5, 12, 6, 0), 14.0, "rain", "10d"),
            sample(utc_ts(2024, 5, 10, 9, 0), 11.0, "clear", "01d"),
        ];

        let entries = aggregate_daily(&samples).unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, ["2024-05-10", "2024-05-11", "2024-05-12"]);
        assert!(entries.windows(2).all(|pair| pair[0].dt <= pair[1].dt));
        assert!(entries.iter().all(|e| e.temp_min <= e.temp_max));
    }

    #[test]
    fn test_min_max_is_order_independent() {
        let mut samples = vec![
            sample(utc_ts(2024, 5, 10, 0, 0), 9.0, "clear", "01d"),
            sample(utc_ts(2024, 5, 10, 3, 0), 17.0, "clouds", "03d"),
            sample(utc_ts(2024, 5, 10, 6, 0), 4.0, "rain", "10d"),
        ];

        let forward = aggregate_daily(&samples).unwrap();
        samples.reverse();
        let backward = aggregate_daily(&samples).unwrap();

        assert_eq!(forward[0].temp_min, backward[0].temp_min);
        assert_eq!(forward[0].temp_max, backward[0].temp_max);
    }

    #[test]
    fn test_condition_tie_break_first_encountered() {
        let samples = vec![
            sample(utc_ts(2024, 5, 10, 0, 0), 10.0, "rain", "10d"),
            sample(utc_ts(2024, 5, 10, 3, 0), 10.0, "clear", "01d"),
        ];

        // one occurrence each, the first-seen description wins
        let entries = aggregate_daily(&samples).unwrap();
        assert_eq!(entries[0].description, "rain");
    }

    #[test]
    fn test_condition_majority_beats_first() {
        let samples = vec![
            sample(utc_ts(2024, 5, 10, 0, 0), 10.0, "clear", "01d"),
            sample(utc_ts(2024, 5, 10, 3, 0), 10.0, "rain", "10d"),
            sample(utc_ts(2024, 5, 10, 6, 0), 10.0, "rain", "10d"),
        ];

        let entries = aggregate_daily(&samples).unwrap();
        assert_eq!(entries[0].description, "rain");
    }

    #[test]
    fn test_midday_sample_supplies_icon_regardless_of_order() {
        let noon = sample(local_ts(2024, 5, 10, 12), 15.0, "clear", "noon-icon");
        let afternoon = sample(local_ts(2024, 5, 10, 14), 12.0, "clouds", "afternoon-icon");

        let entries = aggregate_daily(&[afternoon.clone(), noon.clone()]).unwrap();
        assert_eq!(entries[0].icon, "noon-icon");

        let entries = aggregate_daily(&[noon, afternoon]).unwrap();
        assert_eq!(entries[0].icon, "noon-icon");
    }

    #[test]
    fn test_icon_falls_back_to_first_sample() {
        let samples = vec![
            sample(local_ts(2024, 5, 10, 9), 10.0, "clear", "morning-icon"),
            sample(local_ts(2024, 5, 10, 14), 12.0, "clear", "afternoon-icon"),
        ];

        let entries = aggregate_daily(&samples).unwrap();
        assert_eq!(entries[0].icon, "morning-icon");
    }

    #[test]
    fn test_empty_input_is_valid() {
        assert!(aggregate_daily(&[]).unwrap().is_empty());

        let summary = aggregate_historical(&[]).unwrap();
        assert!(summary.current.is_none());
        assert!(summary.forecast.is_empty());
    }

    #[test]
    fn test_sample_without_main_aborts_batch() {
        let mut bad = sample(utc_ts(2024, 5, 10, 6, 0), 10.0, "clear", "01d");
        bad.main = None;
        let samples = vec![sample(utc_ts(2024, 5, 10, 3, 0), 10.0, "clear", "01d"), bad];

        let err = aggregate_daily(&samples).unwrap_err();
        assert!(matches!(err, WeatherVaultError::InvalidSample { .. }));
    }

    #[test]
    fn test_sample_without_conditions_aborts_batch() {
        let mut bad = sample(utc_ts(2024, 5, 10, 6, 0), 10.0, "clear", "01d");
        bad.weather.clear();

        let err = aggregate_daily(&[bad]).unwrap_err();
        assert!(matches!(err, WeatherVaultError::InvalidSample { .. }));
    }

    #[test]
    fn test_historical_keeps_first_sample_as_current_without_midday_bias() {
        let samples = vec![
            sample(local_ts(2024, 5, 10, 6), 10.0, "clear", "morning-icon"),
            sample(local_ts(2024, 5, 10, 12), 16.0, "clouds", "noon-icon"),
        ];

        let summary = aggregate_historical(&samples).unwrap();
        let current = summary.current.unwrap();
        assert_eq!(current.temp, 10.0);
        assert_eq!(current.description, "clear");

        // no midday bias: the first sample's icon stands for the whole day
        assert_eq!(summary.forecast[0].icon, "morning-icon");
    }

    #[test]
    fn test_local_midnight_boundary_dedup() {
        // Grouping keys off UTC dates while dedup keys off local dates. These
        // two samples sit on different UTC dates; whether the second group
        // survives depends on the host timezone's rendering of both
        // representative timestamps.
        let late = sample(utc_ts(2024, 5, 10, 23, 30), 10.0, "clear", "01d");
        let early = sample(utc_ts(2024, 5, 11, 0, 30), 11.0, "clear", "01d");

        let entries = aggregate_daily(&[late.clone(), early.clone()]).unwrap();

        let collide = local_date_key(late.dt) == local_date_key(early.dt);
        if collide {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].dt, late.dt);
        } else {
            assert_eq!(entries.len(), 2);
        }

        // the historical path never deduplicates on local dates
        let summary = aggregate_historical(&[late, early]).unwrap();
        assert_eq!(summary.forecast.len(), 2);
    }
}
