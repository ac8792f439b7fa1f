// File: ./src/daily.rs
//! Daily-log store: one text document per calendar date.
//!
//! The core only needs a stable identity per date; [`FileDailyLogStore`]
//! maps a date to `<notes>/daily/YYYY-MM-DD.md`.
//!
//! All writes to one date go through a single per-date writer lock so an
//! editor auto-save and a migration insert into the same note can't
//! overwrite each other. Use [`DailyLogStore::update`] for read-modify-write.
use crate::config::Config;
use crate::context::AppContext;
use crate::dates::format_date;
use crate::error::{StoreError, StoreResult};
use crate::storage::LocalStorage;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Edit closure passed to [`DailyLogStore::update`]; receives the current text,
/// or `None` when the date has no log yet.
pub type EditFn<'a> = &'a (dyn Fn(Option<&str>) -> String + Send + Sync);

#[async_trait]
pub trait DailyLogStore: Send + Sync {
    async fn exists(&self, date: NaiveDate) -> StoreResult<bool>;

    /// Fails with [`StoreError::NotFound`] when there is no log for `date`.
    async fn read(&self, date: NaiveDate) -> StoreResult<String>;

    async fn write(&self, date: NaiveDate, text: &str) -> StoreResult<()>;

    /// Read-modify-write as one serialized step. Returns the text written.
    async fn update(&self, date: NaiveDate, edit: EditFn<'_>) -> StoreResult<String> {
        let current = self.read_opt(date).await?;
        let next = edit(current.as_deref());
        self.write(date, &next).await?;
        Ok(next)
    }

    /// [`DailyLogStore::read`] with `NotFound` mapped to `None`.
    async fn read_opt(&self, date: NaiveDate) -> StoreResult<Option<String>> {
        match self.read(date).await {
            Ok(text) => Ok(Some(text)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

// --- File-backed store ---

#[derive(Debug)]
pub struct FileDailyLogStore {
    daily_dir: PathBuf,
    writers: Mutex<HashMap<NaiveDate, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileDailyLogStore {
    /// `notes_dir` is the notes root; daily logs go into its `daily` subdirectory.
    pub fn new(notes_dir: impl Into<PathBuf>) -> Self {
        Self {
            daily_dir: notes_dir.into().join("daily"),
            writers: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_context(ctx: &dyn AppContext, config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(config.resolve_notes_dir(ctx)?))
    }

    pub fn daily_dir(&self) -> &Path {
        &self.daily_dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.daily_dir.join(format!("{}.md", format_date(date)))
    }

    /// The single logical writer for `date`.
    fn writer(&self, date: NaiveDate) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.writers.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(date)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn read_path(path: &Path, date: NaiveDate) -> StoreResult<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::NotFound(date),
            _ => StoreError::Io(e),
        })
    }
}

#[async_trait]
impl DailyLogStore for FileDailyLogStore {
    async fn exists(&self, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.path_for(date).is_file())
    }

    async fn read(&self, date: NaiveDate) -> StoreResult<String> {
        Self::read_path(&self.path_for(date), date)
    }

    async fn write(&self, date: NaiveDate, text: &str) -> StoreResult<()> {
        let writer = self.writer(date);
        let _guard = writer.lock().await;
        let path = self.path_for(date);
        LocalStorage::with_lock(&path, || -> StoreResult<()> {
            LocalStorage::atomic_write(&path, text)?;
            Ok(())
        })?;
        log::debug!("Wrote daily log {}", path.display());
        Ok(())
    }

    async fn update(&self, date: NaiveDate, edit: EditFn<'_>) -> StoreResult<String> {
        let writer = self.writer(date);
        let _guard = writer.lock().await;
        let path = self.path_for(date);
        LocalStorage::with_lock(&path, || -> StoreResult<String> {
            let current = match Self::read_path(&path, date) {
                Ok(text) => Some(text),
                Err(StoreError::NotFound(_)) => None,
                Err(e) => return Err(e),
            };
            let next = edit(current.as_deref());
            LocalStorage::atomic_write(&path, &next)?;
            Ok(next)
        })
    }
}

// --- In-memory store ---

/// Store kept entirely in memory; used by tests and embedders that own persistence.
#[derive(Debug, Default)]
pub struct MemoryDailyLogStore {
    docs: Mutex<BTreeMap<NaiveDate, String>>,
}

impl MemoryDailyLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, date: NaiveDate, text: impl Into<String>) {
        self.lock().insert(date, text.into());
    }

    pub fn get(&self, date: NaiveDate) -> Option<String> {
        self.lock().get(&date).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<NaiveDate, String>> {
        self.docs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DailyLogStore for MemoryDailyLogStore {
    async fn exists(&self, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.lock().contains_key(&date))
    }

    async fn read(&self, date: NaiveDate) -> StoreResult<String> {
        self.get(date).ok_or(StoreError::NotFound(date))
    }

    async fn write(&self, date: NaiveDate, text: &str) -> StoreResult<()> {
        self.insert(date, text);
        Ok(())
    }

    async fn update(&self, date: NaiveDate, edit: EditFn<'_>) -> StoreResult<String> {
        let mut docs = self.lock();
        let next = edit(docs.get(&date).map(String::as_str));
        docs.insert(date, next.clone());
        Ok(next)
    }
}
