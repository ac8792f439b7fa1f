// File: ./src/ledger.rs
//! Migration history ledger and the review watermark.
//!
//! Both live in the key-value settings store:
//! - `lastReviewedDate`: `YYYY-MM-DD`; no scan is needed for any date up to
//!   and including it.
//! - `migrationHistory`: append-only list of [`MigrationHistoryEntry`].
//!
//! Appends are read-modify-write on the list, serialized through this handle.
use crate::dates::{format_date, parse_date};
use crate::error::{StoreError, StoreResult};
use crate::model::MigrationHistoryEntry;
use crate::settings::SettingsStore;
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;

pub const LAST_REVIEWED_KEY: &str = "lastReviewedDate";
pub const HISTORY_KEY: &str = "migrationHistory";

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn SettingsStore>,
    append_guard: Arc<tokio::sync::Mutex<()>>,
}

impl Ledger {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self {
            store,
            append_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// The watermark. An absent or unreadable value counts as "never reviewed".
    pub async fn last_reviewed(&self) -> StoreResult<Option<NaiveDate>> {
        let value = self.store.get(LAST_REVIEWED_KEY).await?;
        let Some(value) = value else {
            return Ok(None);
        };
        let parsed = value.as_str().and_then(parse_date);
        if parsed.is_none() {
            log::warn!("Ignoring unreadable {} value: {}", LAST_REVIEWED_KEY, value);
        }
        Ok(parsed)
    }

    pub async fn set_last_reviewed(&self, date: NaiveDate) -> StoreResult<()> {
        log::info!("Advancing review watermark to {}", date);
        self.store
            .set(LAST_REVIEWED_KEY, Value::String(format_date(date)))
            .await
    }

    pub async fn history(&self) -> StoreResult<Vec<MigrationHistoryEntry>> {
        match self.store.get(HISTORY_KEY).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => {
                serde_json::from_value(value).map_err(|source| StoreError::Malformed {
                    key: HISTORY_KEY.to_string(),
                    source,
                })
            }
        }
    }

    /// Append `entries` in order. Nothing is written when `entries` is empty.
    pub async fn append(&self, entries: &[MigrationHistoryEntry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let _guard = self.append_guard.lock().await;
        let mut history = self.history().await?;
        history.extend_from_slice(entries);
        let value = serde_json::to_value(&history)?;
        self.store.set(HISTORY_KEY, value).await
    }

    /// Was `content` from `original_date` already moved into `target_date`?
    pub async fn was_moved(
        &self,
        content: &str,
        original_date: NaiveDate,
        target_date: NaiveDate,
    ) -> StoreResult<bool> {
        let (original, target) = (format_date(original_date), format_date(target_date));
        Ok(self
            .history()
            .await?
            .iter()
            .any(|e| e.is_move_of(content, &original, &target)))
    }

    /// Clears the watermark and the whole history.
    ///
    /// Best-effort: both deletes are attempted even if the first fails; the
    /// first failure is returned.
    pub async fn reset(&self) -> StoreResult<()> {
        let _guard = self.append_guard.lock().await;
        let watermark = self.store.delete(LAST_REVIEWED_KEY).await;
        let history = self.store.delete(HISTORY_KEY).await;
        if let Err(e) = &watermark {
            log::warn!("Failed to clear {}: {}", LAST_REVIEWED_KEY, e);
        }
        if let Err(e) = &history {
            log::warn!("Failed to clear {}: {}", HISTORY_KEY, e);
        }
        log::info!("Migration ledger reset");
        watermark.and(history)
    }
}
