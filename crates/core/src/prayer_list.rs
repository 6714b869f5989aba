//! Prayer list rules and anniversary computation.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/* --------------------------------------------------------------------------
Constants
-------------------------------------------------------------------------- */

/// Default look-ahead for the anniversaries listing.
pub const DEFAULT_ANNIVERSARY_WINDOW_DAYS: i64 = 30;

/// Longest look-ahead accepted (one leap year).
pub const MAX_ANNIVERSARY_WINDOW_DAYS: i64 = 366;

/// Maximum length of the private notes attached to a prayer list entry.
pub const MAX_NOTES_LENGTH: usize = 1_000;

/* --------------------------------------------------------------------------
Anniversaries
-------------------------------------------------------------------------- */

/// Which date an anniversary commemorates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnniversaryKind {
    Birth,
    Death,
}

/// The next occurrence of a birth or death anniversary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingAnniversary {
    pub memorial_id: DbId,
    pub kind: AnniversaryKind,
    pub date: NaiveDate,
    /// Completed years being commemorated.
    pub years: i32,
    /// Days from today; 0 means today.
    pub days_until: i64,
}

/// Validate the `days` look-ahead, defaulting when absent.
pub fn validate_window_days(days: Option<i64>) -> Result<i64, CoreError> {
    let days = days.unwrap_or(DEFAULT_ANNIVERSARY_WINDOW_DAYS);
    if !(1..=MAX_ANNIVERSARY_WINDOW_DAYS).contains(&days) {
        return Err(CoreError::Validation(format!(
            "days must be between 1 and {MAX_ANNIVERSARY_WINDOW_DAYS}"
        )));
    }
    Ok(days)
}

/// Validate optional prayer list notes.
pub fn validate_notes(notes: Option<&str>) -> Result<(), CoreError> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LENGTH => Err(CoreError::Validation(format!(
            "notes exceed maximum length of {MAX_NOTES_LENGTH} characters"
        ))),
        _ => Ok(()),
    }
}

/// The anniversary of `original` in `year`.
///
/// February 29 is observed on February 28 in non-leap years.
pub fn anniversary_in_year(original: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, original.month(), original.day()).or_else(|| {
        if original.month() == 2 && original.day() == 29 {
            NaiveDate::from_ymd_opt(year, 2, 28)
        } else {
            None
        }
    })
}

/// Next anniversary of `original` on or after `today`, if it falls within
/// `window_days` and commemorates at least one full year.
pub fn next_anniversary(
    original: NaiveDate,
    today: NaiveDate,
    window_days: i64,
) -> Option<(NaiveDate, i32, i64)> {
    let candidate = [today.year(), today.year() + 1]
        .into_iter()
        .filter_map(|y| anniversary_in_year(original, y))
        .find(|d| *d >= today)?;
    let years = candidate.year() - original.year();
    if years < 1 {
        return None;
    }
    let days_until = (candidate - today).num_days();
    (days_until <= window_days).then_some((candidate, years, days_until))
}

/// Upcoming birth and death anniversaries for one memorial.
pub fn upcoming_for_memorial(
    memorial_id: DbId,
    birth_date: Option<NaiveDate>,
    death_date: Option<NaiveDate>,
    today: NaiveDate,
    window_days: i64,
) -> Vec<UpcomingAnniversary> {
    [
        (AnniversaryKind::Birth, birth_date),
        (AnniversaryKind::Death, death_date),
    ]
    .into_iter()
    .filter_map(|(kind, original)| {
        let (date, years, days_until) = next_anniversary(original?, today, window_days)?;
        Some(UpcomingAnniversary {
            memorial_id,
            kind,
            date,
            years,
            days_until,
        })
    })
    .collect()
}
