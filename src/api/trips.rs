use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use super::metrics;
use super::users::require_user;
use super::validation::validate_create_trip;
use crate::db::{
    CreateTripRequest, DateFilterQuery, DateRange, DriverLog, Stop, Trip, TripWithRecords,
};
use crate::hos;
use crate::AppState;

/// GET /api/user/:user_id/trips
///
/// Newest first, optionally restricted to trips starting within
/// `start_date..=end_date`.
pub async fn list_trips(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<DateFilterQuery>,
) -> Result<Json<Vec<Trip>>, ApiError> {
    let range = DateRange::from_query(&query, false).map_err(ApiError::bad_request)?;
    require_user(&state, user_id).await?;

    let trips = Trip::list_for_user(&state.db, user_id, &range).await?;
    Ok(Json(trips))
}

/// POST /api/user/:user_id/trips
///
/// The trip and any nested logs and stops are stored in one transaction.
pub async fn create_trip(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    ApiJson(req): ApiJson<CreateTripRequest>,
) -> Result<(StatusCode, Json<TripWithRecords>), ApiError> {
    require_user(&state, user_id).await?;
    let new_logs = validate_create_trip(&req)?;

    let mut tx = state.db.begin().await?;

    let trip = Trip::insert(&mut *tx, user_id, &req).await?;

    let mut logs = Vec::with_capacity(new_logs.len());
    for entry in &new_logs {
        logs.push(DriverLog::insert(&mut *tx, trip.id, user_id, entry).await?);
    }

    let mut stops = Vec::with_capacity(req.stops.len());
    for stop in &req.stops {
        stops.push(Stop::insert(&mut *tx, trip.id, user_id, stop).await?);
    }

    tx.commit().await?;

    tracing::info!(
        trip_id = trip.id,
        user_id,
        logs = logs.len(),
        stops = stops.len(),
        "Trip created"
    );
    metrics::record_trip_created();
    metrics::record_logs_created(logs.len());

    metrics::record_hos_outcome(hos::record_trip_logs(&state.db, user_id, &logs).await);

    logs.sort_by(|a, b| a.log_time.cmp(&b.log_time).then(a.id.cmp(&b.id)));
    stops.sort_by(|a, b| a.stop_time.cmp(&b.stop_time).then(a.id.cmp(&b.id)));

    Ok((StatusCode::CREATED, Json(TripWithRecords { trip, logs, stops })))
}

/// GET /api/trip/:trip_id
pub async fn get_trip(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<i64>,
) -> Result<Json<TripWithRecords>, ApiError> {
    let trip = Trip::find_by_id(&state.db, trip_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Trip not found"))?;

    let logs = DriverLog::list_for_trip(&state.db, trip.id).await?;
    let stops = Stop::list_for_trip(&state.db, trip.id).await?;

    Ok(Json(TripWithRecords { trip, logs, stops }))
}
