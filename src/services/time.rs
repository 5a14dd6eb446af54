//! Turns whatever a user or the agent typed as a date into a UTC instant.
//!
//! Accepted shapes: RFC 3339 with offset or `Z`, offset without seconds,
//! and bare local forms (`YYYY-MM-DD HH:MM[:SS]`, `YYYY-MM-DDTHH:MM[:SS]`,
//! `YYYY-MM-DD`) which are read in the community timezone. A first pass
//! parses the input as given; if that fails the date/time space is replaced
//! by `T` and parsing is retried once.
//!
//! Language models like to guess an already elapsed year for "next Friday".
//! Anything more than 24 hours in the past is moved to the current year, and
//! one year further if that is still in the past.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{AppError, AppResult};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn normalize_start_at(raw: &str, now: DateTime<Utc>, tz: Tz) -> AppResult<DateTime<Utc>> {
    let parsed = parse_instant(raw, tz)?;
    Ok(repair_year(parsed, now))
}

/// Serialized form used in logs, prompts and the agent contract.
pub fn format_utc(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Tomorrow (relative to `now` in the community timezone) at `hour:minute` local time.
pub fn tomorrow_at(now: DateTime<Utc>, tz: Tz, hour: u32, minute: u32) -> AppResult<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| AppError::ValidationError(format!("{hour:02}:{minute:02} is not a time of day")))?;
    let tomorrow = now.with_timezone(&tz).date_naive() + Duration::days(1);
    localize(tomorrow.and_time(time), tz)
}

fn parse_instant(raw: &str, tz: Tz) -> AppResult<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::ValidationError("a start time is required".to_string()));
    }

    if let Some(instant) = parse_once(trimmed, tz)? {
        return Ok(instant);
    }
    let retried = trimmed.replacen(' ', "T", 1);
    parse_once(&retried, tz)?.ok_or_else(|| {
        AppError::ValidationError(format!(
            "could not read '{trimmed}' as a date, try YYYY-MM-DD HH:MM"
        ))
    })
}

fn parse_once(s: &str, tz: Tz) -> AppResult<Option<DateTime<Utc>>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M%:z") {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    if let Some(utc_part) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return Ok(parse_naive(utc_part).map(|naive| Utc.from_utc_datetime(&naive)));
    }
    if let Some(naive) = parse_naive(s) {
        return localize(naive, tz).map(Some);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return localize(date.and_time(NaiveTime::MIN), tz).map(Some);
    }
    Ok(None)
}

fn parse_naive(s: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Ambiguous local times (DST fall-back) resolve to the earlier instant.
fn localize(naive: NaiveDateTime, tz: Tz) -> AppResult<DateTime<Utc>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| {
            AppError::ValidationError(format!("{naive} does not exist in {tz} (clock change)"))
        })
}

/// Feb 29 carried into a non-leap year becomes Mar 1.
fn repair_year(instant: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let cutoff = now - Duration::hours(24);
    if instant >= cutoff {
        return instant;
    }

    let with_year = |year: i32| {
        instant.with_year(year).unwrap_or_else(|| {
            let day_before = instant - Duration::days(1);
            day_before.with_year(year).unwrap_or(day_before) + Duration::days(1)
        })
    };

    let candidate = with_year(now.year());
    if candidate >= cutoff {
        return candidate;
    }
    with_year(now.year() + 1)
}
