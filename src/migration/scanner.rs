// File: ./src/migration/scanner.rs
use crate::config::DEFAULT_LOOKBACK_DAYS;
use crate::daily::DailyLogStore;
use crate::dates::{format_date, previous_day};
use crate::error::{StoreError, StoreResult};
use crate::ledger::Ledger;
use crate::model::{MigrationTask, ParsedDocument, parse};
use chrono::NaiveDate;

/// Finds the unfinished tasks that today's review has to decide on.
pub struct MigrationScanner<'a> {
    logs: &'a dyn DailyLogStore,
    ledger: &'a Ledger,
    lookback_days: u32,
}

impl<'a> MigrationScanner<'a> {
    pub fn new(logs: &'a dyn DailyLogStore, ledger: &'a Ledger) -> Self {
        Self {
            logs,
            ledger,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Build the review queue for `today`.
    ///
    /// Walks back from yesterday to the most recent log that still has open
    /// tasks, then drops tasks already present in today's text or already
    /// moved into today by an earlier review. Returned tasks keep their
    /// source line order.
    ///
    /// The watermark is advanced to `today` when there is nothing to review;
    /// a non-empty result leaves it untouched.
    pub async fn scan(&self, today: NaiveDate) -> StoreResult<Vec<MigrationTask>> {
        if let Some(last) = self.ledger.last_reviewed().await?
            && last >= today
        {
            log::debug!("Already reviewed through {}, skipping scan", last);
            return Ok(Vec::new());
        }

        let Some(source) = self.find_source(today).await? else {
            log::info!(
                "No unfinished tasks in the {} days before {}",
                self.lookback_days,
                today
            );
            self.ledger.set_last_reviewed(today).await?;
            return Ok(Vec::new());
        };

        let today_text = self.logs.read_opt(today).await?.unwrap_or_default();
        let history = self.ledger.history().await?;
        let (source_key, today_key) = (format_date(source.date), format_date(today));

        let queue: Vec<MigrationTask> = source
            .incomplete_tasks()
            .filter(|t| !today_text.contains(t.content.as_str()))
            .filter(|t| {
                !history
                    .iter()
                    .any(|e| e.is_move_of(&t.content, &source_key, &today_key))
            })
            .map(MigrationTask::from)
            .collect();

        if queue.is_empty() {
            log::info!(
                "All open tasks from {} are already handled for {}",
                source.date,
                today
            );
            self.ledger.set_last_reviewed(today).await?;
        } else {
            log::info!(
                "{} task(s) from {} need a decision",
                queue.len(),
                source.date
            );
        }
        Ok(queue)
    }

    /// Most recent date within the lookback window whose log has open tasks.
    async fn find_source(&self, today: NaiveDate) -> StoreResult<Option<ParsedDocument>> {
        let mut date = today;
        for _ in 0..self.lookback_days {
            date = previous_day(date);
            if !self.logs.exists(date).await? {
                continue;
            }
            let text = match self.logs.read(date).await {
                Ok(text) => text,
                // Removed between exists() and read().
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            let doc = parse(&text, date);
            if doc.has_outstanding_tasks() {
                return Ok(Some(doc));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::MemoryDailyLogStore;
    use crate::model::{Decision, MigrationHistoryEntry};
    use crate::settings::MemorySettingsStore;
    use std::sync::Arc;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn setup() -> (MemoryDailyLogStore, Ledger) {
        (
            MemoryDailyLogStore::new(),
            Ledger::new(Arc::new(MemorySettingsStore::new())),
        )
    }

    #[tokio::test]
    async fn test_fresh_install_is_empty_and_advances_watermark() {
        let (logs, ledger) = setup();
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert!(queue.is_empty());
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }

    #[tokio::test]
    async fn test_yesterday_open_task_is_found() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "## Tasks\n* [ ] Write report\n* [x] Done thing");
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].content, "Write report");
        assert_eq!(queue[0].original_date, "2025-03-09");
        assert_eq!(queue[0].line_number, 2);
        // Review pending: watermark untouched.
        assert_eq!(ledger.last_reviewed().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_skips_gaps_and_finished_days() {
        let (logs, ledger) = setup();
        logs.insert(d(2), "* [ ] Old open\n  * [ ] Sub open");
        logs.insert(d(5), "* [x] All done\n* [ ]  ");
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        let names: Vec<_> = queue.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(names, vec!["Old open", "Sub open"]);
        assert_eq!(queue[1].indent_level, 1);
        assert!(queue.iter().all(|t| t.original_date == "2025-03-02"));
    }

    #[tokio::test]
    async fn test_only_the_most_recent_open_day_is_used() {
        let (logs, ledger) = setup();
        logs.insert(d(7), "* [ ] Older");
        logs.insert(d(8), "* [ ] Newer");
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].content, "Newer");
    }

    #[tokio::test]
    async fn test_lookback_window_bounds_the_walk() {
        let (logs, ledger) = setup();
        logs.insert(d(1), "* [ ] Too old");
        let queue = MigrationScanner::new(&logs, &ledger)
            .with_lookback_days(3)
            .scan(d(10))
            .await
            .unwrap();
        assert!(queue.is_empty());
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }

    #[tokio::test]
    async fn test_watermark_today_short_circuits() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] Pending");
        ledger.set_last_reviewed(d(10)).await.unwrap();
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert!(queue.is_empty());

        // Next day scans again.
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(11)).await.unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn test_future_watermark_also_short_circuits() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] Pending");
        ledger.set_last_reviewed(d(12)).await.unwrap();
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert!(queue.is_empty());
        // The later watermark is kept, not rewound to today.
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(12)));
    }

    #[tokio::test]
    async fn test_tasks_already_in_today_are_filtered() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] Buy milk\n* [ ] Call mom");
        logs.insert(d(10), "## Tasks\n* [ ] Buy milk and eggs");
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        let names: Vec<_> = queue.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(names, vec!["Call mom"]);
    }

    #[tokio::test]
    async fn test_ledger_moves_into_today_are_filtered() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] Moved before\n* [ ] Dismissed before");
        let moved = MigrationTask {
            id: "x".into(),
            content: "Moved before".into(),
            original_date: "2025-03-09".into(),
            line_number: 1,
            indent_level: 0,
        };
        let dismissed = MigrationTask {
            content: "Dismissed before".into(),
            ..moved.clone()
        };
        ledger
            .append(&[
                MigrationHistoryEntry::new(&moved, Decision::Move, Some("2025-03-10".into())),
                MigrationHistoryEntry::new(&dismissed, Decision::Dismiss, None),
            ])
            .await
            .unwrap();

        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        let names: Vec<_> = queue.iter().map(|t| t.content.as_str()).collect();
        // Only moves paired with this exact source/target count.
        assert_eq!(names, vec!["Dismissed before"]);
    }

    #[tokio::test]
    async fn test_everything_filtered_advances_watermark() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] Copied by hand");
        logs.insert(d(10), "* [ ] Copied by hand");
        let queue = MigrationScanner::new(&logs, &ledger).scan(d(10)).await.unwrap();
        assert!(queue.is_empty());
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }
}
