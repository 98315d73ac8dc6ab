//! Hours-of-Service bookkeeping.
//!
//! Driver log entries are folded into one summary row per user and calendar
//! day holding the hours driven, on duty and resting, plus what remains under
//! the 11-hour driving and 14-hour duty limits.

mod aggregator;
mod description;

pub use aggregator::{
    apply_increments, available_hours, compute_daily_increments, round_hours, DailyIncrement,
};
pub use description::{drive_hours, miles_remaining, rest_hours};

use sqlx::SqlitePool;
use tracing::{error, info};

use crate::db::{format_date, now_timestamp, DailyHosSummary, DriverLog, UpdateHosRequest};

/// Daily driving limit in hours
pub const MAX_DRIVE_HOURS: f64 = 11.0;
/// Daily on-duty limit in hours
pub const MAX_DUTY_HOURS: f64 = 14.0;

/// What happened when new log entries were folded into the summaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// No entries to fold
    Skipped,
    /// Number of daily summaries written
    Updated(usize),
    /// The summaries could not be written; the error was logged
    Failed,
}

/// Fold freshly created log entries into the user's daily summaries.
///
/// Bookkeeping failures are logged and swallowed; the entries themselves
/// are already stored and the caller's request still succeeds.
pub async fn record_trip_logs(
    db: &SqlitePool,
    user_id: i64,
    logs: &[DriverLog],
) -> AggregationOutcome {
    if logs.is_empty() {
        return AggregationOutcome::Skipped;
    }

    let increments = compute_daily_increments(logs);
    match apply_increments(db, user_id, &increments).await {
        Ok(summaries) => {
            info!(
                user_id,
                logs = logs.len(),
                days = summaries.len(),
                "HOS summaries updated"
            );
            AggregationOutcome::Updated(summaries.len())
        }
        Err(e) => {
            error!(user_id, logs = logs.len(), error = %e, "Failed to update HOS summaries");
            AggregationOutcome::Failed
        }
    }
}

/// Summary values after applying explicit overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryValues {
    pub total_drive_time: f64,
    pub total_duty_time: f64,
    pub total_rest_time: f64,
    pub available_drive_time: f64,
    pub available_duty_time: f64,
}

/// Merge `req` over the existing row (or a fresh zeroed day). Availability
/// not given explicitly is recomputed from the resulting totals.
pub fn merge_overrides(existing: Option<&DailyHosSummary>, req: &UpdateHosRequest) -> SummaryValues {
    let (drive, duty, rest) = existing
        .map(|s| (s.total_drive_time, s.total_duty_time, s.total_rest_time))
        .unwrap_or((0.0, 0.0, 0.0));

    let total_drive_time = round_hours(req.total_drive_time.unwrap_or(drive));
    let total_duty_time = round_hours(req.total_duty_time.unwrap_or(duty));
    let total_rest_time = round_hours(req.total_rest_time.unwrap_or(rest));

    SummaryValues {
        total_drive_time,
        total_duty_time,
        total_rest_time,
        available_drive_time: req
            .available_drive_time
            .map(round_hours)
            .unwrap_or_else(|| available_hours(MAX_DRIVE_HOURS, total_drive_time)),
        available_duty_time: req
            .available_duty_time
            .map(round_hours)
            .unwrap_or_else(|| available_hours(MAX_DUTY_HOURS, total_duty_time)),
    }
}

/// Create or overwrite one day's summary with explicit values.
/// Returns the stored row and whether it was newly created.
///
/// The read and the write share an immediate transaction so the write lock
/// is held before the existing row is read.
pub async fn upsert_overrides(
    db: &SqlitePool,
    user_id: i64,
    req: &UpdateHosRequest,
) -> Result<(DailyHosSummary, bool), sqlx::Error> {
    let mut tx = db.begin_with("BEGIN IMMEDIATE").await?;

    let existing = DailyHosSummary::find_for_date(&mut *tx, user_id, &req.log_date).await?;
    let created = existing.is_none();
    let values = merge_overrides(existing.as_ref(), req);

    let summary: DailyHosSummary = sqlx::query_as(
        r#"
        INSERT INTO daily_hos_summary (
            user_id, log_date, total_drive_time, total_duty_time, total_rest_time,
            available_drive_time, available_duty_time, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, log_date) DO UPDATE SET
            total_drive_time = excluded.total_drive_time,
            total_duty_time = excluded.total_duty_time,
            total_rest_time = excluded.total_rest_time,
            available_drive_time = excluded.available_drive_time,
            available_duty_time = excluded.available_duty_time,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(format_date(&req.log_date))
    .bind(values.total_drive_time)
    .bind(values.total_duty_time)
    .bind(values.total_rest_time)
    .bind(values.available_drive_time)
    .bind(values.available_duty_time)
    .bind(now_timestamp())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok((summary, created))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_in_memory;
    use chrono::NaiveDate;

    fn request(date: &str) -> UpdateHosRequest {
        UpdateHosRequest {
            log_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            total_drive_time: None,
            total_duty_time: None,
            total_rest_time: None,
            available_drive_time: None,
            available_duty_time: None,
        }
    }

    fn summary(drive: f64, duty: f64, rest: f64) -> DailyHosSummary {
        DailyHosSummary {
            id: 1,
            user_id: 1,
            log_date: "2025-03-01".to_string(),
            total_drive_time: drive,
            total_duty_time: duty,
            total_rest_time: rest,
            available_drive_time: available_hours(MAX_DRIVE_HOURS, drive),
            available_duty_time: available_hours(MAX_DUTY_HOURS, duty),
            updated_at: now_timestamp(),
        }
    }

    #[test]
    fn test_merge_on_fresh_day_uses_defaults() {
        let values = merge_overrides(None, &request("2025-03-01"));
        assert_eq!(
            values,
            SummaryValues {
                total_drive_time: 0.0,
                total_duty_time: 0.0,
                total_rest_time: 0.0,
                available_drive_time: 11.0,
                available_duty_time: 14.0,
            }
        );
    }

    #[test]
    fn test_merge_recomputes_availability_from_overridden_totals() {
        let existing = summary(4.0, 6.0, 0.5);
        let mut req = request("2025-03-01");
        req.total_drive_time = Some(12.0);

        let values = merge_overrides(Some(&existing), &req);
        assert_eq!(values.total_drive_time, 12.0);
        assert_eq!(values.total_duty_time, 6.0);
        assert_eq!(values.total_rest_time, 0.5);
        assert_eq!(values.available_drive_time, 0.0);
        assert_eq!(values.available_duty_time, 8.0);
    }

    #[test]
    fn test_merge_keeps_explicit_availability() {
        let mut req = request("2025-03-01");
        req.total_drive_time = Some(3.0);
        req.available_drive_time = Some(5.5);

        let values = merge_overrides(None, &req);
        assert_eq!(values.available_drive_time, 5.5);
        assert_eq!(values.available_duty_time, 14.0);
    }

    #[tokio::test]
    async fn test_upsert_overrides_creates_then_updates() {
        let pool = init_in_memory().await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) VALUES (7, 'd', 'd@example.com', 'x', '', '')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let mut req = request("2025-03-01");
        req.total_duty_time = Some(9.0);
        let (first, created) = upsert_overrides(&pool, 7, &req).await.unwrap();
        assert!(created);
        assert_eq!(first.available_duty_time, 5.0);

        let mut req = request("2025-03-01");
        req.total_rest_time = Some(10.0);
        let (second, created) = upsert_overrides(&pool, 7, &req).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.total_duty_time, 9.0);
        assert_eq!(second.total_rest_time, 10.0);
    }

    #[tokio::test]
    async fn test_record_trip_logs_swallows_failures() {
        let pool = init_in_memory().await.unwrap();
        let logs = vec![DriverLog {
            id: 1,
            trip_id: 1,
            user_id: 99,
            log_time: "2025-03-01T08:00:00.000Z".to_string(),
            status: "Pickup".to_string(),
            description: "Pickup".to_string(),
            latitude: None,
            longitude: None,
            miles_remaining: None,
            created_at: now_timestamp(),
        }];

        // No user 99: the foreign key rejects the summary, which is only logged
        let outcome = record_trip_logs(&pool, 99, &logs).await;
        assert_eq!(outcome, AggregationOutcome::Failed);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM daily_hos_summary")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    fn driver_log(id: i64, user_id: i64, log_time: &str, description: &str) -> DriverLog {
        DriverLog {
            id,
            trip_id: 1,
            user_id,
            log_time: log_time.to_string(),
            status: "Driving".to_string(),
            description: description.to_string(),
            latitude: None,
            longitude: None,
            miles_remaining: None,
            created_at: now_timestamp(),
        }
    }

    async fn insert_user(pool: &SqlitePool, id: i64) {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) VALUES (?, 'd', 'd@example.com', 'x', '', '')",
        )
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_record_trip_logs_reports_days_written() {
        let pool = init_in_memory().await.unwrap();
        insert_user(&pool, 3).await;

        assert_eq!(
            record_trip_logs(&pool, 3, &[]).await,
            AggregationOutcome::Skipped
        );

        let logs = vec![
            driver_log(1, 3, "2025-03-01T08:00:00.000Z", "Driving for 120 minutes"),
            driver_log(2, 3, "2025-03-02T08:00:00.000Z", "Driving for 60 minutes"),
        ];
        assert_eq!(
            record_trip_logs(&pool, 3, &logs).await,
            AggregationOutcome::Updated(2)
        );
    }

    #[tokio::test]
    async fn test_concurrent_overrides_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init(dir.path()).await.unwrap();
        insert_user(&pool, 5).await;

        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let mut req = request("2025-03-01");
                req.total_drive_time = Some(i as f64);
                upsert_overrides(&pool, 5, &req).await
            }));
        }

        let mut created = 0;
        for handle in handles {
            let (_, was_created) = handle.await.unwrap().unwrap();
            if was_created {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM daily_hos_summary")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 1);
    }
}
