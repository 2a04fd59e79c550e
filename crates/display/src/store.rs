// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistence for the single [`ClientConfig`] record.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::Context;
use parking_lot::Mutex;
use tracing::warn;

use crate::config::ClientConfig;

/// Fixed key the record is stored under.
pub const STORAGE_KEY: &str = "display-config";

pub trait ConfigStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    fn load(&self) -> anyhow::Result<Option<ClientConfig>>;
    fn save(&self, config: &ClientConfig) -> anyhow::Result<()>;
}

/// Load the stored record, substituting defaults when it is missing or
/// unreadable.
pub fn load_or_default(store: &dyn ConfigStore) -> ClientConfig {
    match store.load() {
        Ok(Some(config)) => config,
        Ok(None) => ClientConfig::default(),
        Err(e) => {
            warn!(err = %format!("{e:#}"), "stored display config unreadable, using defaults");
            ClientConfig::default()
        }
    }
}

/// JSON file `<dir>/display-config.json`, written atomically.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(format!("{STORAGE_KEY}.json")) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> anyhow::Result<Option<ClientConfig>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(config))
    }

    fn save(&self, config: &ClientConfig) -> anyhow::Result<()> {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let json = serde_json::to_string_pretty(config)?;
        let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self.path.with_file_name(format!(
            "{STORAGE_KEY}.json.{}.{seq}.tmp",
            std::process::id()
        ));
        std::fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

/// In-process store holding the raw serialized record.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    raw: Mutex<Option<String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with arbitrary text, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self { raw: Mutex::new(Some(raw.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.raw.lock().clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> anyhow::Result<Option<ClientConfig>> {
        match self.raw.lock().as_deref() {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, config: &ClientConfig) -> anyhow::Result<()> {
        *self.raw.lock() = Some(serde_json::to_string(config)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
