//! Cookie mirror of the token.
//!
//! The mirror exists for request-time code (route guards, middleware) that can
//! see cookies but not the durable store. `FileCookieJar` persists cookies as
//! JSON in the cache directory; `token_from_cookie_header` reads the token back
//! out of a raw `Cookie` request header.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::store::{CookieJar, StoreError};

/// Cookie jar file name in cache directory
const COOKIE_FILE: &str = "cookies.json";

/// HTTP date format used in `Expires`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires: DateTime<Utc>,
    pub same_site: SameSite,
    pub secure: bool,
}

impl Cookie {
    /// An empty cookie dated at the epoch, which tells the jar to drop it.
    pub fn expired(name: &str, secure: bool) -> Self {
        Self {
            name: name.to_string(),
            value: String::new(),
            path: "/".to_string(),
            expires: DateTime::<Utc>::UNIX_EPOCH,
            same_site: SameSite::Lax,
            secure,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Render as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}; Expires={}; SameSite={}",
            self.name,
            self.value,
            self.path,
            self.expires.format(HTTP_DATE_FORMAT),
            self.same_site.as_str()
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Extract the named cookie from a `Cookie` request header (`a=1; b=2`).
/// Returns `None` for a missing or empty value.
pub fn token_from_cookie_header(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie jar persisted to disk, shared with request-time readers.
pub struct FileCookieJar {
    cache_dir: PathBuf,
    lock: Mutex<()>,
}

impl FileCookieJar {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lock: Mutex::new(()),
        }
    }

    /// Render the live cookies as a `Cookie` request header.
    pub fn cookie_header(&self) -> Result<String, StoreError> {
        let now = Utc::now();
        let cookies = self.load()?;
        let mut pairs: Vec<String> = cookies
            .values()
            .filter(|c| !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        pairs.sort();
        Ok(pairs.join("; "))
    }

    fn load(&self) -> Result<HashMap<String, Cookie>, StoreError> {
        let path = self.cookie_path();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, cookies: &HashMap<String, Cookie>) -> Result<(), StoreError> {
        let path = self.cookie_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(cookies)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn cookie_path(&self) -> PathBuf {
        self.cache_dir.join(COOKIE_FILE)
    }
}

impl CookieJar for FileCookieJar {
    fn get(&self, name: &str) -> Result<Option<Cookie>, StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("cookie jar lock poisoned".to_string()))?;
        Ok(self.load()?.remove(name))
    }

    fn set(&self, cookie: Cookie) -> Result<(), StoreError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| StoreError::Unavailable("cookie jar lock poisoned".to_string()))?;
        let mut cookies = self.load()?;
        if cookie.is_expired_at(Utc::now()) {
            debug!(name = %cookie.name, "Dropping expired cookie");
            cookies.remove(&cookie.name);
        } else {
            cookies.insert(cookie.name.clone(), cookie);
        }
        self.save(&cookies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cookie(name: &str, value: &str, expires: DateTime<Utc>) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            expires,
            same_site: SameSite::Lax,
            secure: false,
        }
    }

    #[test]
    fn test_set_cookie_rendering() {
        let expires = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let mut c = cookie("auth_token", "a.b.c", expires);
        assert_eq!(
            c.to_set_cookie(),
            "auth_token=a.b.c; Path=/; Expires=Wed, 21 Oct 2015 07:28:00 GMT; SameSite=Lax"
        );

        c.secure = true;
        assert!(c.to_set_cookie().ends_with("; SameSite=Lax; Secure"));
    }

    #[test]
    fn test_token_from_cookie_header() {
        let header = "theme=dark; auth_token=a.b.c; lang=en";
        assert_eq!(token_from_cookie_header(header, "auth_token").as_deref(), Some("a.b.c"));
        assert_eq!(token_from_cookie_header(header, "missing"), None);
        assert_eq!(token_from_cookie_header("auth_token=", "auth_token"), None);
        assert_eq!(token_from_cookie_header("", "auth_token"), None);
        // Prefix of another cookie name must not match
        assert_eq!(token_from_cookie_header("xauth_token=1", "auth_token"), None);
    }

    #[test]
    fn test_file_jar_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let expires = Utc::now() + Duration::hours(1);

        FileCookieJar::new(dir.path().to_path_buf())
            .set(cookie("auth_token", "a.b.c", expires))
            .unwrap();

        let reopened = FileCookieJar::new(dir.path().to_path_buf());
        let read = reopened.get("auth_token").unwrap().expect("cookie persisted");
        assert_eq!(read.value, "a.b.c");
        assert_eq!(reopened.cookie_header().unwrap(), "auth_token=a.b.c");
    }

    #[test]
    fn test_file_jar_drops_expired_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let jar = FileCookieJar::new(dir.path().to_path_buf());
        jar.set(cookie("auth_token", "a.b.c", Utc::now() + Duration::hours(1))).unwrap();
        jar.set(Cookie::expired("auth_token", false)).unwrap();

        assert_eq!(jar.get("auth_token").unwrap(), None);
        assert_eq!(jar.cookie_header().unwrap(), "");
    }

    #[test]
    fn test_file_jar_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COOKIE_FILE), "not json").unwrap();
        let jar = FileCookieJar::new(dir.path().to_path_buf());
        assert!(matches!(jar.get("auth_token"), Err(StoreError::Corrupt(_))));
    }
}
