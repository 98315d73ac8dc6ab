//! Trip models and DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use super::common::{format_timestamp, now_timestamp, DateRange};
use super::driver_log::{CreateLogRequest, DriverLog};
use super::stop::{CreateStopRequest, Stop};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Trip {
    #[serde(rename = "trip_id")]
    pub id: i64,
    pub user_id: i64,
    pub pickup_location_name: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_location_name: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    /// Miles
    pub total_distance: f64,
    /// Hours, as are the remaining duration fields
    pub total_duration: f64,
    pub driving_time: f64,
    pub rest_time: f64,
    pub total_hos_used: f64,
    pub initial_hos: f64,
    pub start_time: String,
    pub end_time: String,
    pub created_at: String,
}

impl Trip {
    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<Trip>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM trips WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Trips whose `start_time` falls inside `range`, newest first
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
        range: &DateRange,
    ) -> Result<Vec<Trip>, sqlx::Error> {
        let (lower, upper) = range.timestamp_bounds();
        sqlx::query_as(
            r#"
            SELECT * FROM trips
            WHERE user_id = ?
              AND (? IS NULL OR start_time >= ?)
              AND (? IS NULL OR start_time < ?)
            ORDER BY start_time DESC, id DESC
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

    pub async fn insert<'e, E>(
        executor: E,
        user_id: i64,
        req: &CreateTripRequest,
    ) -> Result<Trip, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as(
            r#"
            INSERT INTO trips (
                user_id, pickup_location_name, pickup_lat, pickup_lng,
                dropoff_location_name, dropoff_lat, dropoff_lng,
                total_distance, total_duration, driving_time, rest_time,
                total_hos_used, initial_hos, start_time, end_time, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(req.pickup_location_name.trim())
        .bind(req.pickup_lat)
        .bind(req.pickup_lng)
        .bind(req.dropoff_location_name.trim())
        .bind(req.dropoff_lat)
        .bind(req.dropoff_lng)
        .bind(req.total_distance)
        .bind(req.total_duration)
        .bind(req.driving_time)
        .bind(req.rest_time)
        .bind(req.total_hos_used)
        .bind(req.initial_hos)
        .bind(format_timestamp(&req.start_time))
        .bind(format_timestamp(&req.end_time))
        .bind(now_timestamp())
        .fetch_one(executor)
        .await
    }
}

/// Trip with its logs and stops for detail and create responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripWithRecords {
    #[serde(flatten)]
    pub trip: Trip,
    pub logs: Vec<DriverLog>,
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTripRequest {
    pub pickup_location_name: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_location_name: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub total_distance: f64,
    pub total_duration: f64,
    #[serde(default)]
    pub driving_time: f64,
    #[serde(default)]
    pub rest_time: f64,
    #[serde(default)]
    pub total_hos_used: f64,
    #[serde(default)]
    pub initial_hos: f64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<CreateLogRequest>,
    #[serde(default)]
    pub stops: Vec<CreateStopRequest>,
}
