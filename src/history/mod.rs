//! Deterministic synthetic time series for metric and subscription history.
//!
//! Nothing here touches the store: callers pass the metric id as the seed and,
//! for relative series, the latest stored value as the base.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::HistoryConfig;
use crate::entities::metrics;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Start time must be before end time")]
    StartNotBeforeEnd,

    #[error("Interval must be a positive number of minutes")]
    NonPositiveInterval,

    #[error("Time range is out of bounds")]
    OutOfRange,

    #[error("Requested window would produce {points} points (limit {limit})")]
    TooManyPoints { points: u64, limit: usize },
}

/// A validated `[start, end]` range sampled every `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: Duration,
    points: usize,
}

impl TimeWindow {
    pub fn new(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval_minutes: i64,
        max_points: usize,
    ) -> Result<Self, HistoryError> {
        if start >= end {
            return Err(HistoryError::StartNotBeforeEnd);
        }
        if interval_minutes <= 0 {
            return Err(HistoryError::NonPositiveInterval);
        }

        let span_ms = (end - start).num_milliseconds();
        // An interval too large to represent can only yield the start point.
        let points = interval_minutes
            .checked_mul(60_000)
            .map_or(1, |step_ms| span_ms / step_ms + 1);
        let points = u64::try_from(points).unwrap_or(u64::MAX);

        let within_limit = usize::try_from(points).ok().filter(|p| *p <= max_points);
        let Some(points) = within_limit else {
            return Err(HistoryError::TooManyPoints {
                points,
                limit: max_points,
            });
        };

        let interval = Duration::try_minutes(interval_minutes).unwrap_or(Duration::MAX);

        Ok(Self {
            start,
            end,
            interval,
            points,
        })
    }

    /// Applies the query defaults: `end` = now, `start` = end minus the
    /// configured window, interval from config.
    pub fn from_query(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        interval_minutes: Option<i64>,
        config: &HistoryConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, HistoryError> {
        let end = end.unwrap_or(now);
        let start = match start {
            Some(start) => start,
            None => end
                .checked_sub_signed(Duration::hours(i64::from(config.default_window_hours)))
                .ok_or(HistoryError::OutOfRange)?,
        };
        let interval = interval_minutes.unwrap_or(config.default_interval_minutes);

        Self::new(start, end, interval, config.max_points)
    }

    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.points
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points == 0
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        std::iter::successors(Some(self.start), |t| t.checked_add_signed(self.interval))
            .take(self.points)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesMode {
    /// Uniform in `[0, 100]`, independent of any stored value.
    Absolute,
    /// `base` perturbed by up to ±10 %.
    Relative { base: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

/// Same `(seed_key, mode, window)` always yields the same series.
#[must_use]
pub fn synthesize(seed_key: i32, mode: SeriesMode, window: &TimeWindow) -> Series {
    let mut rng = rng_for(seed_key);

    let timestamps: Vec<DateTime<Utc>> = window.timestamps().collect();
    let values = timestamps
        .iter()
        .map(|_| match mode {
            SeriesMode::Absolute => rng.random_range(0.0..=100.0),
            SeriesMode::Relative { base } => base + base * rng.random_range(-0.1..=0.1),
        })
        .collect();

    Series { timestamps, values }
}

fn rng_for(seed_key: i32) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(u64::from_le_bytes(i64::from(seed_key).to_le_bytes()))
}

/// One row per metric name: greatest timestamp wins, ties go to the highest
/// id. Output is ordered by name.
#[must_use]
pub fn latest_per_name<I>(rows: I) -> Vec<metrics::Model>
where
    I: IntoIterator<Item = metrics::Model>,
{
    let mut latest: BTreeMap<String, metrics::Model> = BTreeMap::new();

    for row in rows {
        match latest.get(&row.name) {
            Some(current) if (current.timestamp, current.id) >= (row.timestamp, row.id) => {}
            _ => {
                latest.insert(row.name.clone(), row);
            }
        }
    }

    latest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn metric(id: i32, name: &str, value: f64, minutes: i64) -> metrics::Model {
        metrics::Model {
            id,
            device_id: 1,
            name: name.to_string(),
            unit: "kW".to_string(),
            value,
            timestamp: t0() + Duration::minutes(minutes),
        }
    }

    #[test]
    fn test_window_point_count() {
        let window = TimeWindow::new(t0(), t0() + Duration::minutes(65), 15, 10_000).unwrap();
        let series = synthesize(7, SeriesMode::Absolute, &window);

        assert_eq!(series.timestamps.len(), 5);
        assert_eq!(series.values.len(), 5);
        assert_eq!(series.timestamps[0], t0());
        assert_eq!(series.timestamps[4], t0() + Duration::minutes(60));
        for pair in series.timestamps.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(15));
        }
    }

    #[test]
    fn test_end_is_inclusive_on_exact_multiple() {
        let window = TimeWindow::new(t0(), t0() + Duration::hours(1), 5, 10_000).unwrap();
        assert_eq!(window.len(), 13);
        assert_eq!(window.timestamps().last(), Some(t0() + Duration::hours(1)));
    }

    #[test]
    fn test_interval_longer_than_window() {
        let window = TimeWindow::new(t0(), t0() + Duration::minutes(3), 5, 10_000).unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_invalid_ranges() {
        assert_eq!(
            TimeWindow::new(t0(), t0(), 5, 10_000),
            Err(HistoryError::StartNotBeforeEnd)
        );
        assert_eq!(
            TimeWindow::new(t0() + Duration::minutes(1), t0(), 5, 10_000),
            Err(HistoryError::StartNotBeforeEnd)
        );
        assert_eq!(
            TimeWindow::new(t0(), t0() + Duration::hours(1), 0, 10_000),
            Err(HistoryError::NonPositiveInterval)
        );
        assert_eq!(
            TimeWindow::new(t0(), t0() + Duration::hours(1), -5, 10_000),
            Err(HistoryError::NonPositiveInterval)
        );
    }

    #[test]
    fn test_point_cap() {
        let result = TimeWindow::new(t0(), t0() + Duration::hours(24), 1, 100);
        assert_eq!(
            result,
            Err(HistoryError::TooManyPoints {
                points: 1441,
                limit: 100
            })
        );
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let window = TimeWindow::new(t0(), t0() + Duration::hours(1), i64::MAX, 10).unwrap();
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_deterministic_per_seed() {
        let window = TimeWindow::new(t0(), t0() + Duration::hours(2), 5, 10_000).unwrap();

        let a = synthesize(7, SeriesMode::Absolute, &window);
        let b = synthesize(7, SeriesMode::Absolute, &window);
        assert_eq!(a, b);

        let c = synthesize(8, SeriesMode::Absolute, &window);
        assert_ne!(a.values, c.values);
    }

    #[test]
    fn test_absolute_range() {
        let window = TimeWindow::new(t0(), t0() + Duration::hours(24), 5, 10_000).unwrap();
        let series = synthesize(3, SeriesMode::Absolute, &window);
        assert!(series.values.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_relative_stays_within_ten_percent() {
        let window = TimeWindow::new(t0(), t0() + Duration::hours(24), 5, 10_000).unwrap();
        let series = synthesize(1, SeriesMode::Relative { base: 10.5 }, &window);
        assert!(
            series
                .values
                .iter()
                .all(|v| (10.5 * 0.9..=10.5 * 1.1).contains(v))
        );
    }

    #[test]
    fn test_from_query_defaults() {
        let config = HistoryConfig::default();
        let now = t0();
        let window = TimeWindow::from_query(None, None, None, &config, now).unwrap();

        assert_eq!(window.end(), now);
        assert_eq!(window.start(), now - Duration::hours(24));
        assert_eq!(window.interval(), Duration::minutes(5));
        assert_eq!(window.len(), 24 * 12 + 1);
    }

    #[test]
    fn test_from_query_default_start_before_earliest_date() {
        let config = HistoryConfig::default();
        let result =
            TimeWindow::from_query(None, Some(DateTime::<Utc>::MIN_UTC), None, &config, t0());
        assert_eq!(result, Err(HistoryError::OutOfRange));
    }

    #[test]
    fn test_latest_per_name() {
        let rows = vec![
            metric(1, "power", 1.0, 0),
            metric(2, "power", 2.0, 10),
            metric(3, "voltage", 230.0, 5),
            metric(4, "power", 3.0, 10),
            metric(5, "energy", 7.0, -30),
        ];

        let latest = latest_per_name(rows);
        let summary: Vec<(&str, i32)> = latest.iter().map(|m| (m.name.as_str(), m.id)).collect();
        assert_eq!(summary, vec![("energy", 5), ("power", 4), ("voltage", 3)]);
    }

    #[test]
    fn test_latest_per_name_empty() {
        assert!(latest_per_name(Vec::new()).is_empty());
    }
}
