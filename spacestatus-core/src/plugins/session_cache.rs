//! Cached chat session credentials
//!
//! Written after a successful login and read back on the next startup
//! so stateful plugins can reuse their session instead of logging in
//! again. A missing or mismatched cache means fresh authentication,
//! never an error.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

/// Per-host, per-plugin session blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCache {
    /// Server the session was established against
    pub server: String,
    /// Account identity used at login
    pub identity: String,
    /// Device identifier assigned by the server
    pub device_id: String,
    /// Opaque access credential
    pub credential: String,
}

impl SessionCache {
    /// Read a cached session; `None` when the file is absent or not
    /// parseable.
    pub async fn load(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).await.ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Whether this cache was established against the same server and
    /// account identity as the current configuration.
    pub fn matches(&self, server: &str, identity: &str) -> bool {
        self.server == server && self.identity == identity
    }

    /// Persist the session, creating parent directories as needed.
    pub async fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SessionCache {
        SessionCache {
            server: "https://chat.example.org".into(),
            identity: "@status:example.org".into(),
            device_id: "DEVICE1".into(),
            credential: "syt_secret".into(),
        }
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/chatroom-h1.json");

        sample().save(&path).await.unwrap();
        let loaded = SessionCache::load(&path).await.unwrap();
        assert_eq!(loaded, sample());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        assert!(SessionCache::load(Path::new("/nonexistent/cache.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        assert!(SessionCache::load(&path).await.is_none());
    }

    #[test]
    fn test_matches_server_and_identity() {
        let cache = sample();
        assert!(cache.matches("https://chat.example.org", "@status:example.org"));
        assert!(!cache.matches("https://other.example.org", "@status:example.org"));
        assert!(!cache.matches("https://chat.example.org", "@other:example.org"));
    }
}
