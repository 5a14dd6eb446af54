//! `/edit key=value …` grammar.
//!
//! Recognized keys: `title`, `presenter`, `description`, `duration` /
//! `duration_minutes`, `start` / `start_at`, `recreate_zoom`. Unknown keys
//! and tokens without `=` are skipped. Underscores in text values stand for
//! spaces because tokens are whitespace separated.

use crate::error::{AppError, AppResult};
use crate::models::{EventPatch, StartAt};

pub const MIN_DURATION_MINUTES: i32 = 15;
pub const MAX_DURATION_MINUTES: i32 = 240;

pub fn parse_duration(raw: &str) -> AppResult<i32> {
    let minutes: i32 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::ValidationError(format!("'{raw}' is not a number of minutes")))?;
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(AppError::ValidationError(format!(
            "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes"
        )));
    }
    Ok(minutes)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "ja")
}

/// Builds a patch from everything after the command name.
pub fn parse_edit_args(args: &str) -> AppResult<EventPatch> {
    let mut patch = EventPatch::default();
    for token in args.split_whitespace() {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match key.to_ascii_lowercase().as_str() {
            "title" => patch.title = Some(value.replace('_', " ")),
            "presenter" => patch.presenter = Some(value.replace('_', " ")),
            "description" => patch.description = Some(value.replace('_', " ")),
            "duration" | "duration_minutes" => patch.duration_minutes = Some(parse_duration(value)?),
            "start" | "start_at" => patch.start_at = Some(StartAt::Raw(value.to_string())),
            "recreate_zoom" => patch.recreate_conferencing = is_truthy(value),
            _ => {}
        }
    }
    Ok(patch)
}
