//! Daily Hours-of-Service summary models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteExecutor, SqlitePool};

use super::common::{format_date, DateRange};

/// Accumulated and remaining HOS hours for one user on one calendar day
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyHosSummary {
    #[serde(rename = "summary_id")]
    pub id: i64,
    pub user_id: i64,
    pub log_date: String,
    pub total_drive_time: f64,
    pub total_duty_time: f64,
    pub total_rest_time: f64,
    pub available_drive_time: f64,
    pub available_duty_time: f64,
    pub updated_at: String,
}

impl DailyHosSummary {
    pub async fn find_for_date<'e, E>(
        executor: E,
        user_id: i64,
        date: &NaiveDate,
    ) -> Result<Option<DailyHosSummary>, sqlx::Error>
    where
        E: SqliteExecutor<'e>,
    {
        sqlx::query_as("SELECT * FROM daily_hos_summary WHERE user_id = ? AND log_date = ?")
            .bind(user_id)
            .bind(format_date(date))
            .fetch_optional(executor)
            .await
    }

    /// Summaries whose `log_date` falls inside `range` (both ends inclusive)
    pub async fn list_for_user(
        db: &SqlitePool,
        user_id: i64,
        range: &DateRange,
    ) -> Result<Vec<DailyHosSummary>, sqlx::Error> {
        let (lower, upper) = range.date_bounds();
        sqlx::query_as(
            r#"
            SELECT * FROM daily_hos_summary
            WHERE user_id = ?
              AND (? IS NULL OR log_date >= ?)
              AND (? IS NULL OR log_date <= ?)
            ORDER BY log_date ASC
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

/// Explicit overrides for one day's summary. Omitted fields keep their
/// current (or default) value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateHosRequest {
    #[serde(alias = "date")]
    pub log_date: NaiveDate,
    pub total_drive_time: Option<f64>,
    pub total_duty_time: Option<f64>,
    pub total_rest_time: Option<f64>,
    pub available_drive_time: Option<f64>,
    pub available_duty_time: Option<f64>,
}
