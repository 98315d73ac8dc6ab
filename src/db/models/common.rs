//! Timestamp and date helpers shared across models.
//!
//! Timestamps are stored as UTC RFC 3339 text with millisecond precision
//! (`2025-03-01T08:00:00.000Z`) so that string ordering in SQLite matches
//! chronological ordering.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Render a timestamp in the canonical storage format
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the canonical storage format
pub fn now_timestamp() -> String {
    format_timestamp(&Utc::now())
}

/// Render a calendar date as `YYYY-MM-DD`
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` query parameter
pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| format!("Invalid date '{}'. Use YYYY-MM-DD", value))
}

/// First instant of `date` in the canonical storage format
pub fn day_start(date: &NaiveDate) -> String {
    format!("{}T00:00:00.000Z", format_date(date))
}

/// Raw date filter query parameters, accepted by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct DateFilterQuery {
    pub date: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A validated, inclusive range of calendar dates. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Build a range from query parameters. An exact `date` wins over
    /// `start_date`/`end_date` when both are given.
    pub fn from_query(query: &DateFilterQuery, allow_exact: bool) -> Result<Self, String> {
        if allow_exact {
            if let Some(date) = query.date.as_deref().filter(|d| !d.is_empty()) {
                let date = parse_date(date)?;
                return Ok(Self {
                    start: Some(date),
                    end: Some(date),
                });
            }
        }

        let start = match query.start_date.as_deref().filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date(d)?),
            None => None,
        };
        let end = match query.end_date.as_deref().filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date(d)?),
            None => None,
        };

        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err("start_date must not be after end_date".to_string());
            }
        }

        Ok(Self { start, end })
    }

    /// Bounds for a timestamp column: `[start 00:00, (end + 1 day) 00:00)`
    pub fn timestamp_bounds(&self) -> (Option<String>, Option<String>) {
        let lower = self.start.as_ref().map(day_start);
        let upper = self
            .end
            .and_then(|d| d.succ_opt())
            .as_ref()
            .map(day_start);
        (lower, upper)
    }

    /// Bounds for a date column, both inclusive
    pub fn date_bounds(&self) -> (Option<String>, Option<String>) {
        (
            self.start.as_ref().map(format_date),
            self.end.as_ref().map(format_date),
        )
    }
}
