use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use super::metrics;
use super::users::require_user;
use super::validation::validate_log_entry;
use crate::db::{
    BulkLogError, BulkLogResponse, CreateLogRequest, DateFilterQuery, DateRange, DriverLog, Trip,
};
use crate::hos;
use crate::AppState;

/// Accepts `[entry, ...]`, `{"logs": [entry, ...]}` or a single entry object
fn batch_entries(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(entries) => Ok(entries),
        Value::Object(mut object) => match object.remove("logs") {
            Some(Value::Array(entries)) => Ok(entries),
            Some(_) => Err(ApiError::validation_field(
                "logs",
                "logs must be an array of log entries",
            )),
            None => Ok(vec![Value::Object(object)]),
        },
        _ => Err(ApiError::bad_request(
            "Expected a log entry, an array of log entries or an object with a 'logs' array",
        )),
    }
}

fn single_error(field: &str, message: impl Into<String>) -> HashMap<String, Vec<String>> {
    HashMap::from([(field.to_string(), vec![message.into()])])
}

fn bulk_status(created: usize, failed: usize) -> StatusCode {
    match (created, failed) {
        (0, _) => StatusCode::BAD_REQUEST,
        (_, 0) => StatusCode::CREATED,
        _ => StatusCode::MULTI_STATUS,
    }
}

/// POST /api/trip/:trip_id/logs
///
/// Entries are validated and stored independently; the response lists what
/// was created and why the rest was rejected.
pub async fn create_logs(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<i64>,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<BulkLogResponse>), ApiError> {
    let entries = batch_entries(body)?;

    let trip = Trip::find_by_id(&state.db, trip_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Trip not found"))?;

    let mut created = Vec::new();
    let mut errors = Vec::new();

    if entries.is_empty() {
        errors.push(BulkLogError {
            index: 0,
            errors: single_error("logs", "At least one log entry is required"),
        });
    }

    for (index, raw) in entries.into_iter().enumerate() {
        let request: CreateLogRequest = match serde_json::from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                errors.push(BulkLogError {
                    index,
                    errors: single_error("non_field_errors", format!("Malformed entry: {}", e)),
                });
                continue;
            }
        };

        let entry = match validate_log_entry(&request) {
            Ok(entry) => entry,
            Err(field_errors) => {
                errors.push(BulkLogError {
                    index,
                    errors: field_errors,
                });
                continue;
            }
        };

        match DriverLog::insert(&state.db, trip.id, trip.user_id, &entry).await {
            Ok(log) => created.push(log),
            Err(e) => {
                tracing::error!(trip_id = trip.id, index, error = %e, "Failed to store log entry");
                errors.push(BulkLogError {
                    index,
                    errors: single_error("non_field_errors", "Failed to store log entry"),
                });
            }
        }
    }

    let status = bulk_status(created.len(), errors.len());
    tracing::info!(
        trip_id = trip.id,
        created = created.len(),
        rejected = errors.len(),
        "Bulk log request processed"
    );

    if !created.is_empty() {
        metrics::record_logs_created(created.len());
        let outcome = hos::record_trip_logs(&state.db, trip.user_id, &created).await;
        metrics::record_hos_outcome(outcome);
    }

    Ok((status, Json(BulkLogResponse { created, errors })))
}

/// GET /api/user/:user_id/logs
///
/// `date` selects one UTC day; otherwise `start_date`/`end_date` bound the
/// range (inclusive). Ordered by log time.
pub async fn list_user_logs(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<DateFilterQuery>,
) -> Result<Json<Vec<DriverLog>>, ApiError> {
    let range = DateRange::from_query(&query, true).map_err(ApiError::bad_request)?;
    require_user(&state, user_id).await?;

    let logs = DriverLog::list_for_user(&state.db, user_id, &range).await?;
    Ok(Json(logs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_entries_shapes() {
        assert_eq!(batch_entries(json!([{}, {}])).unwrap().len(), 2);
        assert_eq!(batch_entries(json!({"logs": [{}, {}, {}]})).unwrap().len(), 3);
        assert_eq!(
            batch_entries(json!({"status": "Pickup"})).unwrap(),
            vec![json!({"status": "Pickup"})]
        );
        assert!(batch_entries(json!({"logs": "nope"})).is_err());
        assert!(batch_entries(json!(42)).is_err());
    }

    #[test]
    fn test_bulk_status() {
        assert_eq!(bulk_status(3, 0), StatusCode::CREATED);
        assert_eq!(bulk_status(3, 1), StatusCode::MULTI_STATUS);
        assert_eq!(bulk_status(0, 4), StatusCode::BAD_REQUEST);
        assert_eq!(bulk_status(0, 0), StatusCode::BAD_REQUEST);
    }
}
