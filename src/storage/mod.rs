pub mod json_backend;

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use crate::errors::{Result, WizardError};

/// Reserved key holding the cross-session editing snapshot.
pub const SNAPSHOT_KEY: &str = "__wizard_snapshot__";

/// Synchronous string key-value store with last-writer-wins semantics.
///
/// Values are JSON documents; the store itself never interprets them.
pub trait ClientStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;

    fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// In-process store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> WizardError {
    WizardError::Storage("storage lock poisoned".into())
}

impl ClientStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.keys().cloned().collect())
    }
}

pub use json_backend::JsonFileStorage;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_entries() {
        let storage = MemoryStorage::new();
        let view = storage.clone();
        storage.set("Salary", "[]").unwrap();
        assert_eq!(view.get("Salary").unwrap().as_deref(), Some("[]"));
        view.remove("Salary").unwrap();
        assert!(!storage.contains("Salary").unwrap());
    }
}
