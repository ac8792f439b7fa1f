// File: ./src/migration/review.rs
//! Forced-decision review session.
//!
//! A session is `Idle` until a scan yields tasks, then `Reviewing` until every
//! queued task received `move` or `dismiss`. There is no skip or cancel.
//!
//! Applying a decision is ordered so that a failure never loses work:
//! 1. write today's log (moves only),
//! 2. append the ledger entries,
//! 3. drop the tasks from the queue,
//! 4. advance the watermark once the queue is empty.
//!
//! If step 1 or 2 fails the queue is left as it was and the call can be retried.
use crate::config::{Config, DEFAULT_LOOKBACK_DAYS};
use crate::daily::DailyLogStore;
use crate::dates::format_date;
use crate::error::{MigrationError, StoreResult};
use crate::ledger::Ledger;
use crate::migration::scanner::MigrationScanner;
use crate::model::mutator::insert_under_section;
use crate::model::template::{TASKS_SECTION, daily_note_template, task_line};
use crate::model::{Decision, MigrationHistoryEntry, MigrationTask};
use chrono::NaiveDate;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    Idle,
    Reviewing,
}

pub struct MigrationReview {
    logs: Arc<dyn DailyLogStore>,
    ledger: Ledger,
    today: NaiveDate,
    tasks_section: String,
    lookback_days: u32,
    queue: Vec<MigrationTask>,
    total: usize,
}

impl MigrationReview {
    pub fn new(logs: Arc<dyn DailyLogStore>, ledger: Ledger, today: NaiveDate) -> Self {
        Self {
            logs,
            ledger,
            today,
            tasks_section: TASKS_SECTION.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            queue: Vec::new(),
            total: 0,
        }
    }

    /// Take the section heading and lookback window from `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.tasks_section = config.tasks_section.clone();
        self.lookback_days = config.lookback_days;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn state(&self) -> ReviewState {
        if self.queue.is_empty() {
            ReviewState::Idle
        } else {
            ReviewState::Reviewing
        }
    }

    /// The task awaiting a decision (the queue head).
    pub fn current(&self) -> Option<&MigrationTask> {
        self.queue.first()
    }

    pub fn queue(&self) -> &[MigrationTask] {
        &self.queue
    }

    /// `(decided, total)` for the running session.
    pub fn progress(&self) -> (usize, usize) {
        (self.total - self.queue.len(), self.total)
    }

    /// Scan for tasks to review. While a session is already running the
    /// pending queue is returned as is.
    pub async fn start(&mut self) -> StoreResult<&[MigrationTask]> {
        if self.state() == ReviewState::Idle {
            let queue = MigrationScanner::new(self.logs.as_ref(), &self.ledger)
                .with_lookback_days(self.lookback_days)
                .scan(self.today)
                .await?;
            self.total = queue.len();
            self.queue = queue;
        }
        Ok(&self.queue)
    }

    /// Decide on one queued task. Normally the head; any queued id is accepted.
    pub async fn decide(&mut self, task_id: &str, decision: Decision) -> Result<(), MigrationError> {
        let index = self
            .queue
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| MigrationError::UnknownTask(task_id.to_string()))?;
        self.apply(&[index], decision).await
    }

    /// Apply `decision` to every queued task, in queue order.
    pub async fn decide_all(&mut self, decision: Decision) -> Result<(), MigrationError> {
        let indices: Vec<usize> = (0..self.queue.len()).collect();
        self.apply(&indices, decision).await
    }

    async fn apply(&mut self, indices: &[usize], decision: Decision) -> Result<(), MigrationError> {
        if indices.is_empty() {
            return Ok(());
        }
        let tasks: Vec<&MigrationTask> = indices.iter().map(|&i| &self.queue[i]).collect();
        let today_key = format_date(self.today);

        let target = match decision {
            Decision::Move => {
                let lines: Vec<String> = tasks.iter().map(|t| task_line(&t.content)).collect();
                let template = daily_note_template(self.today);
                let section = self.tasks_section.as_str();
                // One insert per task, so a batch lands exactly like repeated decides.
                let edit = |current: Option<&str>| {
                    lines.iter().fold(
                        current.unwrap_or(template.as_str()).to_string(),
                        |text, line| insert_under_section(&text, section, line),
                    )
                };
                if let Err(e) = self.logs.update(self.today, &edit).await {
                    log::warn!("Could not write {}; decision not applied: {}", today_key, e);
                    return Err(e.into());
                }
                Some(today_key.clone())
            }
            Decision::Dismiss => None,
        };

        let entries: Vec<MigrationHistoryEntry> = tasks
            .iter()
            .map(|t| MigrationHistoryEntry::new(t, decision, target.clone()))
            .collect();
        self.ledger.append(&entries).await?;

        log::info!(
            "{} {} task(s) into {}",
            match decision {
                Decision::Move => "Moved",
                Decision::Dismiss => "Dismissed",
            },
            entries.len(),
            today_key
        );

        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for i in sorted {
            self.queue.remove(i);
        }

        if self.queue.is_empty() {
            self.ledger.set_last_reviewed(self.today).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::daily::MemoryDailyLogStore;
    use crate::settings::MemorySettingsStore;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, day).unwrap()
    }

    fn setup() -> (Arc<MemoryDailyLogStore>, Ledger) {
        (
            Arc::new(MemoryDailyLogStore::new()),
            Ledger::new(Arc::new(MemorySettingsStore::new())),
        )
    }

    #[tokio::test]
    async fn test_idle_when_nothing_to_review() {
        let (logs, ledger) = setup();
        let mut review = MigrationReview::new(logs, ledger.clone(), d(10));
        assert!(review.start().await.unwrap().is_empty());
        assert_eq!(review.state(), ReviewState::Idle);
        assert!(review.current().is_none());
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }

    #[tokio::test]
    async fn test_decide_walks_the_queue_and_advances_watermark_at_the_end() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] One\n* [ ] Two");
        logs.insert(d(10), "# Today\n\n## Tasks\n\n* [ ] Existing\n\n## Notes\n");
        let mut review = MigrationReview::new(logs.clone(), ledger.clone(), d(10));
        review.start().await.unwrap();
        assert_eq!(review.state(), ReviewState::Reviewing);
        assert_eq!(review.progress(), (0, 2));

        let first = review.current().unwrap().clone();
        assert_eq!(first.content, "One");
        review.decide(&first.id, Decision::Move).await.unwrap();
        assert_eq!(review.progress(), (1, 2));
        assert_eq!(ledger.last_reviewed().await.unwrap(), None);

        let second = review.current().unwrap().clone();
        review.decide(&second.id, Decision::Dismiss).await.unwrap();
        assert_eq!(review.state(), ReviewState::Idle);
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));

        let today = logs.get(d(10)).unwrap();
        assert!(today.contains("## Tasks\n\n* [ ] One\n* [ ] Existing"));
        assert!(!today.contains("Two"));

        let history = ledger.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].decision, Decision::Move);
        assert_eq!(history[0].target_date.as_deref(), Some("2025-04-10"));
        assert_eq!(history[1].decision, Decision::Dismiss);
        assert_eq!(history[1].target_date, None);
    }

    #[tokio::test]
    async fn test_unknown_task_is_rejected_without_side_effects() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] One");
        let mut review = MigrationReview::new(logs, ledger.clone(), d(10));
        review.start().await.unwrap();
        let err = review.decide("nope", Decision::Move).await.unwrap_err();
        assert!(matches!(err, MigrationError::UnknownTask(_)));
        assert_eq!(review.queue().len(), 1);
        assert!(ledger.history().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decide_all_move_into_new_log() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] A\n* [ ] B\n* [ ] C");
        let mut review = MigrationReview::new(logs.clone(), ledger.clone(), d(10));
        review.start().await.unwrap();
        review.decide_all(Decision::Move).await.unwrap();

        assert_eq!(review.state(), ReviewState::Idle);
        let today = logs.get(d(10)).unwrap();
        // Today's log did not exist, so it was created from the template.
        assert!(today.starts_with("# Thursday, April 10, 2025"));
        // Each insert lands at the top of the section, like repeated decides.
        assert!(today.contains("## Tasks\n\n* [ ] C\n* [ ] B\n* [ ] A\n* [ ]\n"));
        assert_eq!(ledger.history().await.unwrap().len(), 3);
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }

    async fn move_one_by_one(logs: Arc<MemoryDailyLogStore>) -> String {
        let mut review = MigrationReview::new(
            logs.clone(),
            Ledger::new(Arc::new(MemorySettingsStore::new())),
            d(10),
        );
        review.start().await.unwrap();
        while let Some(task) = review.current().cloned() {
            review.decide(&task.id, Decision::Move).await.unwrap();
        }
        logs.get(d(10)).unwrap()
    }

    async fn move_all_at_once(logs: Arc<MemoryDailyLogStore>) -> String {
        let mut review = MigrationReview::new(
            logs.clone(),
            Ledger::new(Arc::new(MemorySettingsStore::new())),
            d(10),
        );
        review.start().await.unwrap();
        review.decide_all(Decision::Move).await.unwrap();
        logs.get(d(10)).unwrap()
    }

    #[tokio::test]
    async fn test_decide_all_matches_repeated_decide() {
        let seeds = [
            Some("## Tasks\n\n* [ ] Existing\n## Notes"),
            Some("no heading here\n"),
            None,
        ];
        for seed in seeds {
            let fresh = || {
                let logs = Arc::new(MemoryDailyLogStore::new());
                logs.insert(d(9), "* [ ] A\n* [ ] B\n* [ ] C");
                if let Some(text) = seed {
                    logs.insert(d(10), text);
                }
                logs
            };
            let one_by_one = move_one_by_one(fresh()).await;
            let batch = move_all_at_once(fresh()).await;
            assert_eq!(one_by_one, batch, "seed {:?}", seed);
        }

        let logs = Arc::new(MemoryDailyLogStore::new());
        logs.insert(d(9), "* [ ] A\n* [ ] B\n* [ ] C");
        logs.insert(d(10), "## Tasks\n\n* [ ] Existing\n## Notes");
        assert_eq!(
            move_all_at_once(logs).await,
            "## Tasks\n\n* [ ] C\n* [ ] B\n* [ ] A\n* [ ] Existing\n## Notes"
        );
    }

    #[tokio::test]
    async fn test_start_does_not_rescan_mid_session() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] A\n* [ ] B");
        let mut review = MigrationReview::new(logs.clone(), ledger, d(10));
        review.start().await.unwrap();
        let head = review.current().unwrap().id.clone();
        logs.insert(d(9), "* [ ] Something else entirely");
        assert_eq!(review.start().await.unwrap()[0].id, head);
    }

    /// Log store that refuses every write.
    struct ReadOnlyLogs(MemoryDailyLogStore);

    #[async_trait::async_trait]
    impl DailyLogStore for ReadOnlyLogs {
        async fn exists(&self, date: NaiveDate) -> StoreResult<bool> {
            self.0.exists(date).await
        }
        async fn read(&self, date: NaiveDate) -> StoreResult<String> {
            self.0.read(date).await
        }
        async fn write(&self, _date: NaiveDate, _text: &str) -> StoreResult<()> {
            Err(std::io::Error::other("disk full").into())
        }
        async fn update(
            &self,
            _date: NaiveDate,
            _edit: crate::daily::EditFn<'_>,
        ) -> StoreResult<String> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[tokio::test]
    async fn test_failed_write_leaves_queue_and_ledger_untouched() {
        let inner = MemoryDailyLogStore::new();
        inner.insert(d(9), "* [ ] Keep me");
        let logs = Arc::new(ReadOnlyLogs(inner));
        let ledger = Ledger::new(Arc::new(MemorySettingsStore::new()));
        let mut review = MigrationReview::new(logs, ledger.clone(), d(10));
        review.start().await.unwrap();

        let id = review.current().unwrap().id.clone();
        let err = review.decide(&id, Decision::Move).await.unwrap_err();
        assert!(matches!(err, MigrationError::Store(_)));
        assert_eq!(review.queue().len(), 1);
        assert!(ledger.history().await.unwrap().is_empty());
        assert_eq!(ledger.last_reviewed().await.unwrap(), None);

        // Dismiss never touches the log, so it still goes through.
        review.decide(&id, Decision::Dismiss).await.unwrap();
        assert_eq!(review.state(), ReviewState::Idle);
        assert_eq!(ledger.last_reviewed().await.unwrap(), Some(d(10)));
    }

    #[tokio::test]
    async fn test_custom_tasks_section_from_config() {
        let (logs, ledger) = setup();
        logs.insert(d(9), "* [ ] A");
        logs.insert(d(10), "## Todo\n- [ ] Mine\n## Log");
        let config = Config {
            tasks_section: "## Todo".to_string(),
            ..Config::default()
        };
        let mut review = MigrationReview::new(logs.clone(), ledger, d(10)).with_config(&config);
        review.start().await.unwrap();
        review.decide_all(Decision::Move).await.unwrap();
        assert_eq!(logs.get(d(10)).unwrap(), "## Todo\n* [ ] A\n- [ ] Mine\n## Log");
    }
}
