//! Age display helper.
//!
//! Age is `current year - birth year`, with no month/day adjustment.
//! Unparseable input yields 0.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

/// Age in whole years for an ISO date of birth, measured against today.
#[must_use]
pub fn age(date_of_birth: &str) -> i32 {
    age_in_year(date_of_birth, Utc::now().year())
}

/// Age in whole years for an ISO date of birth, measured against `current_year`.
#[must_use]
pub fn age_in_year(date_of_birth: &str, current_year: i32) -> i32 {
    birth_year(date_of_birth).map_or(0, |year| current_year - year)
}

fn birth_year(date_of_birth: &str) -> Option<i32> {
    let input = date_of_birth.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date.year());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Some(instant.year());
    }
    // Bare year, e.g. "1935"
    if input.len() == 4 && input.bytes().all(|b| b.is_ascii_digit()) {
        return input.parse().ok();
    }
    None
}
