//! Session metadata cache file.
//!
//! Records who this side is and where the session lives while it runs, and
//! is reset to `{}` on teardown. Holds no secrets: the session code and keys
//! are never written.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::core::StoreError;

use super::handshake::Role;

/// Contents of the cache file during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// This side's role.
    pub role: Role,
    /// Host: own public address. Guest: the host address.
    pub ip: String,
    /// Host: own listening port. Guest: the host port.
    pub port: u16,
    /// Unix time the session started.
    pub started_at: u64,
}

impl CacheEntry {
    /// Entry stamped with the current time.
    pub fn now(role: Role, ip: impl Into<String>, port: u16) -> Self {
        let started_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        Self {
            role,
            ip: ip.into(),
            port,
            started_at,
        }
    }
}

/// JSON file holding the current [`CacheEntry`].
#[derive(Debug, Clone)]
pub struct SessionCache {
    path: PathBuf,
}

impl SessionCache {
    /// Cache at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the running session.
    pub fn write(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        self.write_raw(&serde_json::to_string_pretty(entry)?)
    }

    /// Reset the file to `{}`.
    pub fn clear(&self) -> Result<(), StoreError> {
        self.write_raw("{}")
    }

    /// Read the current entry; `{}` or a missing file reads as `None`.
    pub fn read(&self) -> Result<Option<CacheEntry>, StoreError> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value: serde_json::Value = serde_json::from_str(&data)?;
        if value.as_object().is_some_and(|o| o.is_empty()) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    fn write_raw(&self, contents: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache::new(dir.path().join("data").join("p2p_sessions.json"));
        assert_eq!(cache.read().unwrap(), None);

        let entry = CacheEntry::now(Role::Host, "203.0.113.7", 40000);
        cache.write(&entry).unwrap();
        assert_eq!(cache.read().unwrap(), Some(entry));

        cache.clear().unwrap();
        assert_eq!(std::fs::read_to_string(cache.path()).unwrap(), "{}");
        assert_eq!(cache.read().unwrap(), None);
    }

    #[test]
    fn test_entry_holds_no_code() {
        let entry = CacheEntry::now(Role::Guest, "198.51.100.4", 5000);
        let json = serde_json::to_value(&entry).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        assert!(!keys.iter().any(|k| k.contains("code") || k.contains("key")));
        assert_eq!(json["role"], "guest");
    }
}
