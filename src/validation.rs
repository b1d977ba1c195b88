use chrono::{NaiveDate, NaiveTime, Offset, TimeZone};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid date for {param}: {value:?}. Expected YYYY-MM-DD")]
    InvalidDate { param: &'static str, value: String },

    #[error("start_date {start} is after end_date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("Invalid limit: {0:?}. Expected a positive integer")]
    InvalidLimit(String),
}

/// Upper bound for the `limit` query parameter.
pub const MAX_LIMIT: i64 = 100;

/// Parse an optional `limit` parameter, clamped to `1..=MAX_LIMIT`.
pub fn parse_limit(value: Option<&str>, default: i64) -> Result<i64, ValidationError> {
    let limit = match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => default,
        Some(v) => v
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidLimit(v.to_string()))?,
    };

    if limit < 1 {
        return Err(ValidationError::InvalidLimit(limit.to_string()));
    }

    Ok(limit.min(MAX_LIMIT))
}

/// Parse an optional `YYYY-MM-DD` query parameter. Absent or blank is `None`.
pub fn parse_day(param: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            param,
            value: value.to_string(),
        })
}

/// First millisecond of `day` on the calendar of `tz`.
///
/// When local midnight is ambiguous the earlier instant wins; when it falls
/// in a gap the day starts where the gap does.
pub fn start_of_day_millis<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> i64 {
    let midnight = day.and_time(NaiveTime::MIN);

    match tz.from_local_datetime(&midnight).earliest() {
        Some(dt) => dt.timestamp_millis(),
        None => {
            let offset = tz.offset_from_utc_datetime(&midnight).fix();
            midnight.and_utc().timestamp_millis() - i64::from(offset.local_minus_utc()) * 1000
        }
    }
}

/// Last millisecond of `day` on the calendar of `tz`.
pub fn end_of_day_millis<Tz: TimeZone>(day: NaiveDate, tz: &Tz) -> i64 {
    match day.succ_opt() {
        Some(next) => start_of_day_millis(next, tz) - 1,
        None => i64::MAX,
    }
}

/// Convert an inclusive calendar-day range into inclusive millisecond bounds,
/// with days taken on the calendar of `tz`.
pub fn day_range_to_millis<Tz: TimeZone>(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    tz: &Tz,
) -> Result<(Option<i64>, Option<i64>), ValidationError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }
    }

    Ok((
        start.map(|day| start_of_day_millis(day, tz)),
        end.map(|day| end_of_day_millis(day, tz)),
    ))
}
