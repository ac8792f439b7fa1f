// File: ./src/calendar.rs
// Per-day content markers for a month view.
use crate::daily::DailyLogStore;
use crate::dates::next_day;
use crate::model::parse;
use chrono::{Datelike, NaiveDate};
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;

const CONCURRENT_READS: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentIndicators {
    pub has_tasks: bool,
    pub has_time_blocks: bool,
}

impl ContentIndicators {
    pub fn is_empty(&self) -> bool {
        !self.has_tasks && !self.has_time_blocks
    }
}

/// Every date of `month` in `year`, or an empty list for an invalid month.
pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return Vec::new();
    };
    let mut days = Vec::with_capacity(31);
    let mut day = first;
    while day.month() == month && day.year() == year {
        days.push(day);
        let next = next_day(day);
        if next == day {
            break;
        }
        day = next;
    }
    days
}

/// Which days of the month have tasks or time-blocks with content.
///
/// Days without a log, with only empty items, or whose log could not be read
/// are left out of the map.
pub async fn content_indicators(
    logs: &dyn DailyLogStore,
    year: i32,
    month: u32,
) -> BTreeMap<NaiveDate, ContentIndicators> {
    let reads = days_in_month(year, month).into_iter().map(|date| async move {
        match logs.read_opt(date).await {
            Ok(Some(text)) => {
                let doc = parse(&text, date);
                let indicators = ContentIndicators {
                    has_tasks: doc.has_tasks(),
                    has_time_blocks: doc.has_time_blocks(),
                };
                Some((date, indicators))
            }
            Ok(None) => None,
            Err(e) => {
                log::warn!("Skipping unreadable log for {}: {}", date, e);
                None
            }
        }
    });

    let results: Vec<Option<(NaiveDate, ContentIndicators)>> = stream::iter(reads)
        .buffer_unordered(CONCURRENT_READS)
        .collect()
        .await;

    results
        .into_iter()
        .flatten()
        .filter(|(_, indicators)| !indicators.is_empty())
        .collect()
}
