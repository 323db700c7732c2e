//! In-process storage mediums.
//!
//! Used by headless hosts and tests. Clones share the same backing map, so a
//! test can hand one clone to a `TokenStore` and inspect the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::cookie::Cookie;
use super::store::{CookieJar, DurableStore, StoreError};

fn poisoned() -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().map_err(|_| poisoned())?.remove(key);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryCookieJar {
    cookies: Arc<Mutex<HashMap<String, Cookie>>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Result<Option<Cookie>, StoreError> {
        Ok(self.cookies.lock().map_err(|_| poisoned())?.get(name).cloned())
    }

    fn set(&self, cookie: Cookie) -> Result<(), StoreError> {
        let mut cookies = self.cookies.lock().map_err(|_| poisoned())?;
        if cookie.is_expired_at(Utc::now()) {
            cookies.remove(&cookie.name);
        } else {
            cookies.insert(cookie.name.clone(), cookie);
        }
        Ok(())
    }
}
