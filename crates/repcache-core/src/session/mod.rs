//! Session identity management.
//!
//! The portal identifies a signed-in device by a single opaque membership
//! id handed out at login. The id is persisted to disk so the portal can
//! restore itself across restarts; removing it is the logout / invalidation
//! mechanism, and its absence is a hard precondition failure for every
//! fetch operation.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub membership_id: String,
    pub signed_in_at: DateTime<Utc>,
}

pub struct SessionStore {
    cache_dir: PathBuf,
    data: Mutex<Option<SessionData>>,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: Mutex::new(None),
        }
    }

    /// Load session from disk. Returns true when an identity was restored.
    pub fn load(&self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&path)
            .context("Failed to read session file")?;
        let data: SessionData = serde_json::from_str(&contents)
            .context("Failed to parse session file")?;

        *self.lock() = Some(data);
        Ok(true)
    }

    /// Record a new identity and persist it
    pub fn sign_in(&self, membership_id: &str) -> Result<()> {
        let data = SessionData {
            membership_id: membership_id.to_string(),
            signed_in_at: Utc::now(),
        };

        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&data)?;
        std::fs::write(path, contents)?;

        *self.lock() = Some(data);
        Ok(())
    }

    /// Clear session data from memory and disk
    pub fn clear(&self) -> Result<()> {
        *self.lock() = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// The membership id if a session exists
    pub fn membership_id(&self) -> Option<String> {
        self.lock().as_ref().map(|d| d.membership_id.clone())
    }

    pub fn is_signed_in(&self) -> bool {
        self.lock().is_some()
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<SessionData>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_in_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        store.sign_in("MEM-001").expect("sign in");

        let restored = SessionStore::new(dir.path().to_path_buf());
        assert!(restored.load().expect("load"));
        assert_eq!(restored.membership_id().as_deref(), Some("MEM-001"));
    }

    #[test]
    fn test_clear_removes_identity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        store.sign_in("MEM-001").expect("sign in");
        store.clear().expect("clear");

        assert!(!store.is_signed_in());
        let restored = SessionStore::new(dir.path().to_path_buf());
        assert!(!restored.load().expect("load"));
    }

    #[test]
    fn test_load_without_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().to_path_buf());
        assert!(!store.load().expect("load"));
        assert_eq!(store.membership_id(), None);
    }
}
