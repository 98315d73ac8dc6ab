//! Input validation for API requests.
//!
//! Field validators return `Err(message)` on failure. Request-level
//! validators collect those messages per field with `ValidationErrorBuilder`.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

use crate::db::{
    CreateLogRequest, CreateStopRequest, CreateTripRequest, LogStatus, NewDriverLog, SignupRequest,
    UpdateHosRequest,
};
use crate::hos;

use super::error::{ApiError, ValidationErrorBuilder};

lazy_static! {
    /// Pragmatic email check: local part, one @, dotted domain
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$"
    ).unwrap();

    /// Letters, digits and @ . + - _
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9@.+_-]+$").unwrap();
}

const MAX_USERNAME_LEN: usize = 50;
const MAX_EMAIL_LEN: usize = 100;
const MAX_NAME_LEN: usize = 50;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_LOCATION_NAME_LEN: usize = 255;

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > MAX_EMAIL_LEN {
        return Err(format!("Email is too long (max {} characters)", MAX_EMAIL_LEN));
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), String> {
    let username = username.trim();
    if username.is_empty() {
        return Err("Username is required".to_string());
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(format!(
            "Username is too long (max {} characters)",
            MAX_USERNAME_LEN
        ));
    }
    if !USERNAME_REGEX.is_match(username) {
        return Err(
            "Username may only contain letters, digits and @ . + - _".to_string(),
        );
    }
    Ok(())
}

pub fn validate_name(name: &Option<String>) -> Result<(), String> {
    if let Some(n) = name {
        if n.chars().count() > MAX_NAME_LEN {
            return Err(format!("Name is too long (max {} characters)", MAX_NAME_LEN));
        }
    }
    Ok(())
}

/// At least 8 characters with an ASCII lowercase letter, ASCII uppercase letter and digit
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }
    Ok(())
}

pub fn validate_latitude(lat: f64) -> Result<(), String> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err("Latitude must be between -90 and 90".to_string());
    }
    Ok(())
}

pub fn validate_longitude(lng: f64) -> Result<(), String> {
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err("Longitude must be between -180 and 180".to_string());
    }
    Ok(())
}

/// Hours, miles and similar quantities
pub fn validate_non_negative(value: f64, label: &str) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative number", label));
    }
    Ok(())
}

fn validate_location_name(name: &str, label: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("{} is required", label));
    }
    if name.len() > MAX_LOCATION_NAME_LEN {
        return Err(format!(
            "{} is too long (max {} characters)",
            label, MAX_LOCATION_NAME_LEN
        ));
    }
    Ok(())
}

pub fn validate_signup_request(req: &SignupRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    errors
        .check("username", validate_username(&req.username))
        .check("email", validate_email(&req.email))
        .check("password", validate_password_strength(&req.password))
        .check("name", validate_name(&req.name));
    errors.finish()
}

/// Validate one raw log entry and turn it into an insertable one.
/// Fails with the messages for every offending field.
pub fn validate_log_entry(entry: &CreateLogRequest) -> Result<NewDriverLog, HashMap<String, Vec<String>>> {
    let mut errors = ValidationErrorBuilder::new();

    let log_time = match entry.log_time.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("log_time", "log_time is required");
            None
        }
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(_) => {
                errors.add("log_time", format!("Invalid timestamp '{}'. Use RFC 3339", raw));
                None
            }
        },
    };

    let status = match entry.status.as_deref() {
        None | Some("") => {
            errors.add("status", "status is required");
            None
        }
        Some(raw) => match raw.parse::<LogStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                errors.add("status", e);
                None
            }
        },
    };

    let description = entry.description.as_deref().map(str::trim).unwrap_or("");
    if description.is_empty() {
        errors.add("description", "description is required");
    }

    match (entry.latitude, entry.longitude) {
        (Some(lat), Some(lng)) => {
            errors
                .check("latitude", validate_latitude(lat))
                .check("longitude", validate_longitude(lng));
        }
        (None, None) => {}
        (Some(_), None) => {
            errors.add("longitude", "longitude is required when latitude is given");
        }
        (None, Some(_)) => {
            errors.add("latitude", "latitude is required when longitude is given");
        }
    }

    if let Some(miles) = entry.miles_remaining {
        errors.check("miles_remaining", validate_non_negative(miles, "miles_remaining"));
    }

    match (log_time, status) {
        (Some(log_time), Some(status)) if errors.is_empty() => Ok(NewDriverLog {
            log_time,
            status,
            description: description.to_string(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            miles_remaining: entry
                .miles_remaining
                .or_else(|| hos::miles_remaining(description)),
        }),
        _ => Err(errors.into_errors()),
    }
}

fn validate_stop(errors: &mut ValidationErrorBuilder, index: usize, stop: &CreateStopRequest) {
    let field = |name: &str| format!("stops[{}].{}", index, name);
    errors
        .check(&field("stop_name"), validate_location_name(&stop.stop_name, "stop_name"))
        .check(&field("latitude"), validate_latitude(stop.latitude))
        .check(&field("longitude"), validate_longitude(stop.longitude));
}

/// Validate a trip creation request. Nested log entries are validated and
/// returned ready for insertion; the trip is all-or-nothing.
pub fn validate_create_trip(req: &CreateTripRequest) -> Result<Vec<NewDriverLog>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    errors
        .check(
            "pickup_location_name",
            validate_location_name(&req.pickup_location_name, "pickup_location_name"),
        )
        .check("pickup_lat", validate_latitude(req.pickup_lat))
        .check("pickup_lng", validate_longitude(req.pickup_lng))
        .check(
            "dropoff_location_name",
            validate_location_name(&req.dropoff_location_name, "dropoff_location_name"),
        )
        .check("dropoff_lat", validate_latitude(req.dropoff_lat))
        .check("dropoff_lng", validate_longitude(req.dropoff_lng));

    for (field, value) in [
        ("total_distance", req.total_distance),
        ("total_duration", req.total_duration),
        ("driving_time", req.driving_time),
        ("rest_time", req.rest_time),
        ("total_hos_used", req.total_hos_used),
        ("initial_hos", req.initial_hos),
    ] {
        errors.check(field, validate_non_negative(value, field));
    }

    if req.end_time < req.start_time {
        errors.add("end_time", "end_time must not be before start_time");
    }

    let mut logs = Vec::with_capacity(req.logs.len());
    for (index, entry) in req.logs.iter().enumerate() {
        match validate_log_entry(entry) {
            Ok(log) => logs.push(log),
            Err(entry_errors) => {
                for (field, messages) in entry_errors {
                    for message in messages {
                        errors.add(format!("logs[{}].{}", index, field), message);
                    }
                }
            }
        }
    }

    for (index, stop) in req.stops.iter().enumerate() {
        validate_stop(&mut errors, index, stop);
    }

    errors.finish()?;
    Ok(logs)
}

pub fn validate_hos_update(req: &UpdateHosRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    for (field, value) in [
        ("total_drive_time", req.total_drive_time),
        ("total_duty_time", req.total_duty_time),
        ("total_rest_time", req.total_rest_time),
        ("available_drive_time", req.available_drive_time),
        ("available_duty_time", req.available_duty_time),
    ] {
        if let Some(v) = value {
            errors.check(field, validate_non_negative(v, field));
        }
    }
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(log_time: &str, status: &str, description: &str) -> CreateLogRequest {
        CreateLogRequest {
            log_time: Some(log_time.to_string()),
            status: Some(status.to_string()),
            description: Some(description.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("driver@example.com").is_ok());
        assert!(validate_email("first.last+tag@fleet.co.uk").is_ok());

        assert!(validate_email("").is_err());
        assert!(validate_email("driver").is_err());
        assert!(validate_email("driver@localhost").is_err());
        assert!(validate_email("driver@@example.com").is_err());
        assert!(validate_email("dri ver@example.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("kuldeep").is_ok());
        assert!(validate_username("k.singh_43").is_ok());

        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_password_strength("Truck1234").is_ok());
        assert!(validate_password_strength("aB3defgh").is_ok());

        // too short
        assert!(validate_password_strength("aB3defg").is_err());
        // no uppercase
        assert!(validate_password_strength("truck1234").is_err());
        // no lowercase
        assert!(validate_password_strength("TRUCK1234").is_err());
        // no digit
        assert!(validate_password_strength("TruckTruck").is_err());
    }

    #[test]
    fn test_password_letters_must_be_ascii() {
        assert_eq!(
            validate_password_strength("ÄÖÜäöü12").unwrap_err(),
            "Password must contain at least one lowercase letter"
        );
        assert_eq!(
            validate_password_strength("äöüßtruck12").unwrap_err(),
            "Password must contain at least one uppercase letter"
        );
        assert!(validate_password_strength("ÄÖÜäöüTr12").is_ok());
    }

    #[test]
    fn test_coordinates() {
        assert!(validate_latitude(41.8781).is_ok());
        assert!(validate_longitude(-87.6298).is_ok());
        assert!(validate_latitude(90.5).is_err());
        assert!(validate_longitude(-181.0).is_err());
        assert!(validate_latitude(f64::NAN).is_err());
    }

    #[test]
    fn test_valid_log_entry() {
        let log = validate_log_entry(&entry(
            "2025-03-01T08:00:00-05:00",
            "Off Duty",
            "10-hour required rest period",
        ))
        .unwrap();

        assert_eq!(log.status, LogStatus::OffDuty);
        assert_eq!(log.log_time.to_rfc3339(), "2025-03-01T13:00:00+00:00");
        assert_eq!(log.miles_remaining, None);
    }

    #[test]
    fn test_log_entry_miles_remaining_from_description() {
        let log = validate_log_entry(&entry(
            "2025-03-01T08:00:00Z",
            "Driving",
            "Driving for 60 minutes (212.4 miles remaining)",
        ))
        .unwrap();
        assert_eq!(log.miles_remaining, Some(212.4));

        let mut explicit = entry(
            "2025-03-01T08:00:00Z",
            "Driving",
            "Driving for 60 minutes (212.4 miles remaining)",
        );
        explicit.miles_remaining = Some(200.0);
        assert_eq!(validate_log_entry(&explicit).unwrap().miles_remaining, Some(200.0));
    }

    #[test]
    fn test_invalid_log_entry_reports_each_field() {
        let mut bad = entry("March 1st", "Sleeper Berth", "  ");
        bad.latitude = Some(12.0);

        let errors = validate_log_entry(&bad).unwrap_err();
        assert!(errors.contains_key("log_time"));
        assert!(errors.contains_key("status"));
        assert!(errors.contains_key("description"));
        assert!(errors.contains_key("longitude"));
    }

    #[test]
    fn test_missing_log_fields() {
        let errors = validate_log_entry(&CreateLogRequest::default()).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
