//! Hours carried by a log entry's free-text description.
//!
//! Log producers encode durations in the description text, e.g.
//! `Driving for 95 minutes (212.4 miles remaining)` or
//! `10-hour required rest period (14-hour duty limit reached)`.
//! An entry that does not match contributes nothing.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::LogStatus;

/// Rest credited to a "Resting" entry regardless of its description
pub const SHORT_BREAK_HOURS: f64 = 0.5;
pub const DAILY_RESET_HOURS: f64 = 10.0;
pub const WEEKLY_RESTART_HOURS: f64 = 34.0;

lazy_static! {
    static ref DRIVING_MINUTES_REGEX: Regex = Regex::new(r"Driving for (\d+) minutes").unwrap();

    static ref MILES_REMAINING_REGEX: Regex =
        Regex::new(r"\((\d+(?:\.\d+)?) miles remaining\)").unwrap();
}

/// Hours of driving stated by a "Driving" entry
pub fn drive_hours(description: &str) -> f64 {
    DRIVING_MINUTES_REGEX
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(|minutes| minutes as f64 / 60.0)
        .unwrap_or(0.0)
}

/// Hours of rest credited to a "Resting" or "Off Duty" entry
pub fn rest_hours(status: LogStatus, description: &str) -> f64 {
    match status {
        LogStatus::Resting => SHORT_BREAK_HOURS,
        LogStatus::OffDuty if description.contains("10-hour") => DAILY_RESET_HOURS,
        LogStatus::OffDuty if description.contains("34-hour") => WEEKLY_RESTART_HOURS,
        _ => 0.0,
    }
}

/// Miles remaining stated in a description, used when a client omits
/// `miles_remaining`
pub fn miles_remaining(description: &str) -> Option<f64> {
    MILES_REMAINING_REGEX
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
