// src/utils/datetime.rs

//! Splitting of the site's "date time" strings into report columns.

use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AppError, Result};

/// Placeholder for a value the site did not publish.
pub const NO_DATA: &str = "NO DATA";

/// Placeholder for a time that could not be separated from its date.
pub const NOT_AVAILABLE: &str = "N/D";

/// Longest accepted pause between two resident-mode cycles, one week.
pub const MAX_WATCH_HOURS: u64 = 7 * 24;

/// Pause between two resident-mode cycles.
pub fn watch_interval(every_hours: u64) -> Result<Duration> {
    if !(1..=MAX_WATCH_HOURS).contains(&every_hours) {
        return Err(AppError::validation(format!(
            "watch interval must be between 1 and {MAX_WATCH_HOURS} hours, got {every_hours}"
        )));
    }
    Ok(Duration::from_secs(every_hours * 3600))
}

/// Split a raw "YYYY-MM-DD HH:MM" string into `(dd/mm/YYYY, HH:MM)`.
///
/// Also accepts the glued form "YYYY-MM-DDHH:MM" and strips any HTML tags
/// left in the text. A missing value gives `(NO DATA, NO DATA)`; a date that
/// does not parse is returned as-is with an `N/D` time.
pub fn split_datetime(raw: Option<&str>) -> (String, String) {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return (NO_DATA.to_string(), NO_DATA.to_string());
    };

    let clean = strip_tags(raw);
    let (date_part, time_part) = separate(&clean);

    match NaiveDate::parse_from_str(&date_part, "%Y-%m-%d") {
        Ok(date) => (date.format("%d/%m/%Y").to_string(), time_part),
        Err(_) => (clean, NOT_AVAILABLE.to_string()),
    }
}

fn strip_tags(text: &str) -> String {
    match Regex::new(r"<[^<]+?>") {
        Ok(tags) => tags.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

fn separate(clean: &str) -> (String, String) {
    let glued = Regex::new(r"^(\d{4}-\d{2}-\d{2})(\d{2}:\d{2}.*)$")
        .ok()
        .and_then(|re| re.captures(clean));

    if let Some(caps) = glued {
        let date = caps.get(1).map_or("", |m| m.as_str());
        let time = caps.get(2).map_or("", |m| m.as_str());
        return (date.to_string(), time.trim().to_string());
    }

    match clean.split_once(' ') {
        Some((date, time)) if !time.trim().is_empty() => {
            (date.to_string(), time.trim().to_string())
        }
        Some((date, _)) => (date.to_string(), NOT_AVAILABLE.to_string()),
        None => (clean.to_string(), NOT_AVAILABLE.to_string()),
    }
}
