//! Trip stop models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use super::common::{format_timestamp, now_timestamp};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopType {
    Rest,
    Refueling,
    Pickup,
    Dropoff,
    Other,
}

impl StopType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "Rest",
            Self::Refueling => "Refueling",
            Self::Pickup => "Pickup",
            Self::Dropoff => "Dropoff",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for StopType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Stop {
    #[serde(rename = "stop_id")]
    pub id: i64,
    pub trip_id: i64,
    pub user_id: i64,
    pub stop_time: String,
    pub stop_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stop_type: String,
    pub created_at: String,
}

impl Stop {
    pub async fn insert<'e, E>(
        executor: E,
        trip_id: i64,
        user_id: i64,
        stop: &CreateStopRequest,
    ) -> Result<Stop, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            INSERT INTO stops
                (trip_id, user_id, stop_time, stop_name, latitude, longitude, stop_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(trip_id)
        .bind(user_id)
        .bind(format_timestamp(&stop.stop_time))
        .bind(stop.stop_name.trim())
        .bind(stop.latitude)
        .bind(stop.longitude)
        .bind(stop.stop_type.as_str())
        .bind(now_timestamp())
        .fetch_one(executor)
        .await
    }

    pub async fn list_for_trip(db: &SqlitePool, trip_id: i64) -> Result<Vec<Stop>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM stops WHERE trip_id = ? ORDER BY stop_time ASC, id ASC")
            .bind(trip_id)
            .fetch_all(db)
            .await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStopRequest {
    pub stop_time: DateTime<Utc>,
    pub stop_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stop_type: StopType,
}
