//! Per-day HOS accounting over driver log entries.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::description::{drive_hours, rest_hours};
use super::{MAX_DRIVE_HOURS, MAX_DUTY_HOURS};
use crate::db::{format_date, now_timestamp, DailyHosSummary, DriverLog, LogStatus};

/// Hours contributed to one calendar day by a batch of log entries
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyIncrement {
    pub drive_hours: f64,
    pub duty_hours: f64,
    pub rest_hours: f64,
}

/// Group `logs` by UTC calendar date and total the hours each date gains.
///
/// Duty time is drive time plus one unit per Pickup and per Dropoff entry.
/// Entries with an unreadable timestamp or unknown status are skipped.
pub fn compute_daily_increments(logs: &[DriverLog]) -> BTreeMap<NaiveDate, DailyIncrement> {
    let mut days: BTreeMap<NaiveDate, DailyIncrement> = BTreeMap::new();

    for log in logs {
        let (Some(date), Some(status)) = (log.log_date(), log.status_enum()) else {
            warn!(log_id = log.id, log_time = %log.log_time, status = %log.status, "Skipping unreadable log entry in HOS aggregation");
            continue;
        };

        let day = days.entry(date).or_default();
        match status {
            LogStatus::Driving => {
                let hours = drive_hours(&log.description);
                day.drive_hours += hours;
                day.duty_hours += hours;
            }
            LogStatus::Pickup | LogStatus::Dropoff => {
                day.duty_hours += 1.0;
            }
            LogStatus::Resting | LogStatus::OffDuty => {
                day.rest_hours += rest_hours(status, &log.description);
            }
            LogStatus::Refueling => {}
        }
    }

    days
}

/// Remaining hours under a regulatory ceiling, never negative
pub fn available_hours(ceiling: f64, used: f64) -> f64 {
    round_hours((ceiling - used).max(0.0))
}

/// Hours are kept to two decimal places
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

/// Add each day's increment to the user's summary row for that day,
/// creating the row on first use, and recompute availability.
///
/// Runs in one transaction. Every call adds again: feeding the same
/// entries twice counts them twice.
pub async fn apply_increments(
    db: &SqlitePool,
    user_id: i64,
    increments: &BTreeMap<NaiveDate, DailyIncrement>,
) -> Result<Vec<DailyHosSummary>, sqlx::Error> {
    let mut tx = db.begin().await?;
    let mut summaries = Vec::with_capacity(increments.len());

    for (date, inc) in increments {
        let summary: DailyHosSummary = sqlx::query_as(
            r#"
            INSERT INTO daily_hos_summary (
                user_id, log_date, total_drive_time, total_duty_time, total_rest_time,
                available_drive_time, available_duty_time, updated_at
            )
            VALUES (
                ?1, ?2, round(?3, 2), round(?4, 2), round(?5, 2),
                max(0.0, round(?6 - ?3, 2)), max(0.0, round(?7 - ?4, 2)), ?8
            )
            ON CONFLICT(user_id, log_date) DO UPDATE SET
                total_drive_time = round(total_drive_time + excluded.total_drive_time, 2),
                total_duty_time = round(total_duty_time + excluded.total_duty_time, 2),
                total_rest_time = round(total_rest_time + excluded.total_rest_time, 2),
                available_drive_time = max(0.0, round(?6 - (total_drive_time + excluded.total_drive_time), 2)),
                available_duty_time = max(0.0, round(?7 - (total_duty_time + excluded.total_duty_time), 2)),
                updated_at = excluded.updated_at
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(format_date(date))
        .bind(inc.drive_hours)
        .bind(inc.duty_hours)
        .bind(inc.rest_hours)
        .bind(MAX_DRIVE_HOURS)
        .bind(MAX_DUTY_HOURS)
        .bind(now_timestamp())
        .fetch_one(&mut *tx)
        .await?;

        debug!(
            user_id,
            log_date = %summary.log_date,
            total_drive_time = summary.total_drive_time,
            total_duty_time = summary.total_duty_time,
            "HOS summary updated"
        );
        summaries.push(summary);
    }

    tx.commit().await?;
    Ok(summaries)
}
