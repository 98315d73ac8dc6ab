//! Driver duty-status log models and DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use super::common::{format_timestamp, now_timestamp, DateRange};

/// Duty status of a driver at a point in time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LogStatus {
    Driving,
    Resting,
    Pickup,
    Dropoff,
    #[serde(rename = "Off Duty")]
    OffDuty,
    Refueling,
}

impl LogStatus {
    pub const ALL: [LogStatus; 6] = [
        Self::Driving,
        Self::Resting,
        Self::Pickup,
        Self::Dropoff,
        Self::OffDuty,
        Self::Refueling,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driving => "Driving",
            Self::Resting => "Resting",
            Self::Pickup => "Pickup",
            Self::Dropoff => "Dropoff",
            Self::OffDuty => "Off Duty",
            Self::Refueling => "Refueling",
        }
    }
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("Invalid status '{}'. Must be one of: {}", s, valid.join(", "))
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DriverLog {
    #[serde(rename = "log_id")]
    pub id: i64,
    pub trip_id: i64,
    pub user_id: i64,
    pub log_time: String,
    pub status: String,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub miles_remaining: Option<f64>,
    pub created_at: String,
}

impl DriverLog {
    /// Stored status, or `None` for a value outside the known set
    pub fn status_enum(&self) -> Option<LogStatus> {
        self.status.parse().ok()
    }

    /// UTC calendar date of the entry
    pub fn log_date(&self) -> Option<NaiveDate> {
        DateTime::parse_from_rfc3339(&self.log_time)
            .ok()
            .map(|ts| ts.with_timezone(&Utc).date_naive())
    }

    pub async fn insert<'e, E>(
        executor: E,
        trip_id: i64,
        user_id: i64,
        entry: &NewDriverLog,
    ) -> Result<DriverLog, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            INSERT INTO driver_logs
                (trip_id, user_id, log_time, status, description, latitude, longitude, miles_remaining, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(user_id)
        .bind(format_timestamp(&entry.log_time))
        .bind(entry.status.as_str())
        .bind(&entry.description)
        .bind(entry.latitude)
        .bind(entry.longitude)
        .bind(entry.miles_remaining)
        .bind(now_timestamp())
        .fetch_one(executor)
        .await
    }

    pub async fn list_for_trip(db: &SqlitePool, trip_id: i64) -> Result<Vec<DriverLog>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM driver_logs WHERE trip_id = ? ORDER BY log_time ASC, id ASC")
            .bind(trip_id)
            .fetch_all(db)
            .await
    }

    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
        range: &DateRange,
    ) -> Result<Vec<DriverLog>, sqlx::Error> {
        let (lower, upper) = range.timestamp_bounds();
        sqlx::query_as(
            r#"
            SELECT * FROM driver_logs
            WHERE user_id = ?
              AND (? IS NULL OR log_time >= ?)
              AND (? IS NULL OR log_time < ?)
            ORDER BY log_time ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(&lower)
        .bind(&lower)
        .bind(&upper)
        .bind(&upper)
        .fetch_all(db)
        .await
    }
}

/// Raw log entry as submitted by clients. Fields are optional so that a
/// malformed entry can be reported field by field instead of rejecting the
/// whole payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLogRequest {
    pub log_time: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub miles_remaining: Option<f64>,
}

/// A validated log entry ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewDriverLog {
    pub log_time: DateTime<Utc>,
    pub status: LogStatus,
    pub description: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub miles_remaining: Option<f64>,
}

/// Per-entry failure in a bulk log request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkLogError {
    pub index: usize,
    pub errors: std::collections::HashMap<String, Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BulkLogResponse {
    pub created: Vec<DriverLog>,
    pub errors: Vec<BulkLogError>,
}
