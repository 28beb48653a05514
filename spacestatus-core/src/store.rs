//! Host-scoped status document store
//!
//! Each tenant owns one SpaceAPI-style JSON document. Documents are
//! loaded once at startup, mutated in memory and persisted on demand
//! with [`StatusStore::commit`]. Notifier plugins read the store for
//! the space name and current open state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::AppConfig;

/// Errors raised by the status document store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown host: {0}")]
    UnknownHost(String),

    #[error("failed to read status document for {host}: {source}")]
    Read {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("status document for {host} is not valid JSON: {source}")]
    Parse {
        host: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write status document for {host}: {source}")]
    Write {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("status document for {0} is not a JSON object")]
    NotAnObject(String),
}

/// In-memory store of per-host status documents with file persistence
pub struct StatusStore {
    documents: RwLock<HashMap<String, Value>>,
    files: HashMap<String, PathBuf>,
}

impl StatusStore {
    /// Load every configured host's status document from `data_dir`.
    pub async fn load(config: &AppConfig, data_dir: &Path) -> Result<Self, StoreError> {
        let mut documents = HashMap::new();
        let mut files = HashMap::new();

        for (host, file) in config.host_files() {
            let path = data_dir.join(file);
            info!(host, path = %path.display(), "loading status document");

            let content = fs::read_to_string(&path).await.map_err(|e| StoreError::Read {
                host: host.to_string(),
                source: e,
            })?;
            let document: Value = serde_json::from_str(&content).map_err(|e| StoreError::Parse {
                host: host.to_string(),
                source: e,
            })?;
            if !document.is_object() {
                return Err(StoreError::NotAnObject(host.to_string()));
            }

            documents.insert(host.to_string(), document);
            files.insert(host.to_string(), path);
        }

        Ok(Self {
            documents: RwLock::new(documents),
            files,
        })
    }

    /// Build a store from in-memory documents, without backing files.
    ///
    /// [`StatusStore::commit`] is unavailable for such hosts; intended
    /// for embedding and tests.
    pub fn from_documents(documents: HashMap<String, Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
            files: HashMap::new(),
        }
    }

    /// Full status document for a host, or an empty object.
    pub async fn document(&self, host: &str) -> Value {
        let documents = self.documents.read().await;
        documents
            .get(host)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    /// Human-readable space name from the status document.
    pub async fn display_name(&self, host: &str) -> Option<String> {
        let documents = self.documents.read().await;
        documents.get(host)?.get("space")?.as_str().map(str::to_string)
    }

    /// Current open state.
    pub async fn open_state(&self, host: &str) -> Option<bool> {
        let documents = self.documents.read().await;
        documents.get(host)?.get("state")?.get("open")?.as_bool()
    }

    /// Set the open state, stamping `state.lastchange` on a transition.
    ///
    /// Returns whether the state actually changed; the caller uses this
    /// to decide whether to dispatch notifications.
    pub async fn set_open_state(&self, host: &str, open: bool) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(host)
            .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;
        let state = nested_object(document, host, "state")?;

        if state.get("open").and_then(Value::as_bool) == Some(open) {
            return Ok(false);
        }

        state.insert("open".to_string(), Value::Bool(open));
        state.insert("lastchange".to_string(), Utc::now().timestamp().into());
        Ok(true)
    }

    /// Timestamp of the last state change.
    pub async fn last_modified(&self, host: &str) -> Option<DateTime<Utc>> {
        let documents = self.documents.read().await;
        let timestamp = documents
            .get(host)?
            .get("state")?
            .get("lastchange")?
            .as_i64()?;
        DateTime::from_timestamp(timestamp, 0)
    }

    /// Replace the people-now-present sensor block.
    pub async fn set_people_present(&self, host: &str, people: Value) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(host)
            .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;
        nested_object(document, host, "sensors")?.insert("people_now_present".to_string(), people);
        Ok(())
    }

    /// Replace the temperature sensor block.
    pub async fn set_temperature(&self, host: &str, temperature: Value) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(host)
            .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;
        nested_object(document, host, "sensors")?.insert("temperature".to_string(), temperature);
        Ok(())
    }

    /// Remove the temperature sensor block, reporting whether it was
    /// present.
    pub async fn remove_temperature(&self, host: &str) -> Result<bool, StoreError> {
        let mut documents = self.documents.write().await;
        let document = documents
            .get_mut(host)
            .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;
        Ok(document
            .get_mut("sensors")
            .and_then(Value::as_object_mut)
            .and_then(|sensors| sensors.remove("temperature"))
            .is_some())
    }

    /// Persist a host's document to its backing file.
    ///
    /// The document is written to a temporary file and renamed into
    /// place so a crash mid-write never truncates the stored copy.
    pub async fn commit(&self, host: &str) -> Result<(), StoreError> {
        let path = self
            .files
            .get(host)
            .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;

        let content = {
            let documents = self.documents.read().await;
            let document = documents
                .get(host)
                .ok_or_else(|| StoreError::UnknownHost(host.to_string()))?;
            serde_json::to_string_pretty(document).map_err(|e| StoreError::Parse {
                host: host.to_string(),
                source: e,
            })?
        };

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content).await.map_err(|e| StoreError::Write {
            host: host.to_string(),
            source: e,
        })?;
        fs::rename(&tmp, path).await.map_err(|e| StoreError::Write {
            host: host.to_string(),
            source: e,
        })?;

        info!(host, "status document saved");
        Ok(())
    }
}

/// Mutable access to a top-level sub-object of a status document,
/// created when absent. Fails when the document or the existing entry
/// is not an object.
fn nested_object<'a>(
    document: &'a mut Value,
    host: &str,
    key: &str,
) -> Result<&'a mut serde_json::Map<String, Value>, StoreError> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| StoreError::NotAnObject(host.to_string()))?;
    root.entry(key)
        .or_insert_with(|| Value::Object(Default::default()))
        .as_object_mut()
        .ok_or_else(|| StoreError::NotAnObject(host.to_string()))
}
