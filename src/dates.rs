// File: ./src/dates.rs
// Calendar-day helpers. Dates are keyed by their canonical `YYYY-MM-DD` form,
// which is also the daily log file stem.
use chrono::{Days, NaiveDate};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format date as YYYY-MM-DD.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Format date for display (e.g., "October 25, 2025").
pub fn format_date_for_display(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date.checked_sub_days(Days::new(1)).unwrap_or(date)
}

pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}

/// Shape check for the `H:MM` / `HH:MM` token used by the text dialect.
/// Range is not checked here; the parser accepts "25:99" just like the grammar does.
pub fn is_time_token(s: &str) -> bool {
    let Some((h, m)) = s.split_once(':') else {
        return false;
    };
    (1..=2).contains(&h.len())
        && m.len() == 2
        && h.bytes().all(|b| b.is_ascii_digit())
        && m.bytes().all(|b| b.is_ascii_digit())
}
