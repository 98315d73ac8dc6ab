use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::error::{ApiError, ApiJson};
use super::users::require_user;
use super::validation::validate_hos_update;
use crate::db::{DailyHosSummary, DateFilterQuery, DateRange, UpdateHosRequest};
use crate::hos;
use crate::AppState;

/// GET /api/user/:user_id/hos
pub async fn list_summaries(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    Query(query): Query<DateFilterQuery>,
) -> Result<Json<Vec<DailyHosSummary>>, ApiError> {
    let range = DateRange::from_query(&query, true).map_err(ApiError::bad_request)?;
    require_user(&state, user_id).await?;

    let summaries = DailyHosSummary::list_for_user(&state.db, user_id, &range).await?;
    Ok(Json(summaries))
}

/// POST /api/user/:user_id/hos/update
///
/// 201 when the day had no summary yet, 200 when an existing one changed.
pub async fn update_summary(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateHosRequest>,
) -> Result<(StatusCode, Json<DailyHosSummary>), ApiError> {
    validate_hos_update(&req)?;
    require_user(&state, user_id).await?;

    let (summary, created) = hos::upsert_overrides(&state.db, user_id, &req).await?;
    tracing::info!(user_id, log_date = %summary.log_date, created, "HOS summary overridden");

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(summary)))
}
