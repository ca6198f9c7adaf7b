use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::errors::Result;
use crate::utils::fs::write_atomic;

use super::ClientStorage;

const ENTRY_EXTENSION: &str = "json";

/// File-backed store: one `<escaped key>.json` file per entry.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    root: PathBuf,
}

impl JsonFileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", escape_key(key), ENTRY_EXTENSION))
    }
}

impl ClientStorage for JsonFileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.entry_path(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key);
        write_atomic(&path, value)?;
        debug!(key, path = %path.display(), "entry persisted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(key) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(unescape_key)
            {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// Keeps `[A-Za-z0-9-]` and encodes every other byte as `_XX`.
fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' => escaped.push(byte as char),
            _ => escaped.push_str(&format!("_{byte:02X}")),
        }
    }
    escaped
}

fn unescape_key(stem: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(stem.len());
    let raw = stem.as_bytes();
    let mut index = 0;
    while index < raw.len() {
        if raw[index] == b'_' {
            let hex = stem.get(index + 1..index + 3)?;
            bytes.push(u8::from_str_radix(hex, 16).ok()?);
            index += 3;
        } else {
            bytes.push(raw[index]);
            index += 1;
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SNAPSHOT_KEY;

    #[test]
    fn keys_survive_escaping() {
        let temp = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(temp.path()).unwrap();
        storage.set("Other Income", "[1]").unwrap();
        storage.set("Credit/Card", "[2]").unwrap();
        storage.set(SNAPSHOT_KEY, "{}").unwrap();

        assert_eq!(
            storage.keys().unwrap(),
            vec!["Credit/Card", "Other Income", SNAPSHOT_KEY]
        );
        assert_eq!(storage.get("Credit/Card").unwrap().as_deref(), Some("[2]"));
        assert!(temp.path().join("Other_20Income.json").exists());
    }

    #[test]
    fn missing_entries_read_as_none() {
        let temp = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(temp.path()).unwrap();
        assert_eq!(storage.get("Salary").unwrap(), None);
        storage.remove("Salary").unwrap();
    }

    #[test]
    fn writes_leave_no_temporary_files() {
        let temp = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::new(temp.path()).unwrap();
        storage.set("Salary", "[]").unwrap();
        storage.set("Salary", "[3]").unwrap();
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["Salary.json"]);
    }
}
