//! JSON file backed store used by the command line tool.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use serde_json::{Map, Value};

use super::{ChangeFeed, RuleStore, StoreChange, StoreSnapshot, KEY_ENABLED, KEY_RULES};
use crate::error::StorageError;
use crate::rule::Rule;

/// Store persisted as one JSON object keyed like the browser storage.
///
/// Keys this store does not know about are preserved on write. Change
/// notifications only cover writes made through this handle and its clones.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    feed: ChangeFeed,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            feed: ChangeFeed::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Map<String, Value>, StorageError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(StorageError::Unavailable(format!(
                "'{}' does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn update_document(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value);
        self.write_document(&document)
    }

    /// Write to a temp file next to the target, then rename over it.
    fn write_document(&self, document: &Map<String, Value>) -> Result<(), StorageError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(document)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| StorageError::Io(e.error))?;
        Ok(())
    }
}

impl RuleStore for FileStore {
    fn load(&self) -> Result<StoreSnapshot, StorageError> {
        let document = self.read_document()?;
        Ok(serde_json::from_value(Value::Object(document))?)
    }

    fn save(&self, rules: &[Rule]) -> Result<(), StorageError> {
        self.update_document(KEY_RULES, serde_json::to_value(rules)?)?;
        log::debug!("Saved {} rule(s) to '{}'", rules.len(), self.path.display());
        self.feed.publish(StoreChange::rules());
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), StorageError> {
        self.update_document(KEY_ENABLED, Value::Bool(enabled))?;
        self.feed.publish(StoreChange::enabled(enabled));
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreChange> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::MatchType;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store.json"));
        let snapshot = store.load().unwrap();
        assert!(snapshot.rules.is_empty());
        assert!(snapshot.enabled);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let store = FileStore::new(&path);
        let changes = store.subscribe();

        let rule = Rule::new("old.com", "https://new.com", MatchType::Contains);
        store.save(std::slice::from_ref(&rule)).unwrap();
        store.set_enabled(false).unwrap();

        let reopened = FileStore::new(&path);
        let snapshot = reopened.load().unwrap();
        assert_eq!(snapshot.rules, vec![rule]);
        assert!(!snapshot.enabled);

        assert_eq!(changes.try_recv().unwrap(), StoreChange::rules());
        assert_eq!(changes.try_recv().unwrap(), StoreChange::enabled(false));
    }

    #[test]
    fn test_unknown_keys_survive_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"defaultRedirectUrl":"https://legacy.example","theme":"dark"}"#).unwrap();

        let store = FileStore::new(&path);
        store.save(&[]).unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["theme"], "dark");
        assert_eq!(raw["redirectRules"], serde_json::json!([]));
        assert!(!store.load().unwrap().needs_onboarding());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StorageError::Unavailable(_))));

        fs::write(&path, "{not json").unwrap();
        assert!(matches!(FileStore::new(&path).load(), Err(StorageError::Serialization(_))));
    }
}
