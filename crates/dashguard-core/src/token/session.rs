//! Durable token medium kept in a JSON file in the cache directory.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::store::{DurableStore, StoreError};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Durable store persisted as `session.json`. Survives restarts and works on
/// hosts without a usable OS keychain.
pub struct SessionFile {
    cache_dir: PathBuf,
    lock: Mutex<()>,
}

impl SessionFile {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StoreError> {
        let path = self.session_path();
        if entries.is_empty() {
            if path.exists() {
                std::fs::remove_file(path)?;
            }
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn locked(&self) -> Result<std::sync::MutexGuard<'_, ()>, StoreError> {
        self.lock
            .lock()
            .map_err(|_| StoreError::Unavailable("session file lock poisoned".to_string()))
    }
}

impl DurableStore for SessionFile {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.locked()?;
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.locked()?;
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.locked()?;
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        SessionFile::new(dir.path().to_path_buf())
            .set("auth_token", "a.b.c")
            .unwrap();

        let reopened = SessionFile::new(dir.path().to_path_buf());
        assert_eq!(reopened.get("auth_token").unwrap().as_deref(), Some("a.b.c"));
        assert_eq!(reopened.get("other").unwrap(), None);
    }

    #[test]
    fn test_remove_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = SessionFile::new(dir.path().to_path_buf());
        file.set("auth_token", "a.b.c").unwrap();
        assert!(dir.path().join(SESSION_FILE).exists());

        file.remove("auth_token").unwrap();
        assert_eq!(file.get("auth_token").unwrap(), None);
        assert!(!dir.path().join(SESSION_FILE).exists());

        // Removing again is fine
        file.remove("auth_token").unwrap();
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").unwrap();
        let file = SessionFile::new(dir.path().to_path_buf());
        assert!(matches!(file.get("auth_token"), Err(StoreError::Corrupt(_))));
    }
}
