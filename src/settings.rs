// File: ./src/settings.rs
// Key-value settings store. Values are JSON so callers can keep scalars and
// lists under the same interface.
use crate::context::AppContext;
use crate::error::{StoreError, StoreResult};
use crate::storage::LocalStorage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;
    async fn delete(&self, key: &str) -> StoreResult<()>;
}

/// Settings persisted as one JSON object in a file.
#[derive(Debug)]
pub struct JsonSettingsStore {
    path: PathBuf,
    guard: tokio::sync::Mutex<()>,
}

impl JsonSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn from_context(ctx: &dyn AppContext) -> anyhow::Result<Self> {
        Ok(Self::new(ctx.get_settings_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_map(path: &Path) -> StoreResult<Map<String, Value>> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Malformed {
            key: path.display().to_string(),
            source,
        })
    }

    /// Lock, load, apply `f`, write back.
    async fn modify<F>(&self, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self.guard.lock().await;
        LocalStorage::with_lock(&self.path, || -> StoreResult<()> {
            let mut map = Self::load_map(&self.path)?;
            f(&mut map);
            let json = serde_json::to_string_pretty(&map)?;
            LocalStorage::atomic_write(&self.path, json)?;
            Ok(())
        })
    }
}

#[async_trait]
impl SettingsStore for JsonSettingsStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let _guard = self.guard.lock().await;
        let mut map = LocalStorage::with_lock(&self.path, || Self::load_map(&self.path))?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.modify(|map| {
            map.insert(key.to_string(), value);
        })
        .await
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.modify(|map| {
            map.remove(key);
        })
        .await
    }
}

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.values.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }
}
