//! Dispatch table - at most one live task per (host, plugin) pair
//!
//! The table is the only state in the dispatch path that multiple
//! tasks mutate concurrently. All transitions happen under one lock,
//! so no two acquirers can both observe "may start" for the same key.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Composite key identifying one (host, plugin) notification slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    host: String,
    plugin: String,
}

impl DispatchKey {
    pub fn new(host: &str, plugin: &str) -> Self {
        Self {
            host: host.to_string(),
            plugin: plugin.to_string(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }
}

impl fmt::Display for DispatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.plugin, self.host)
    }
}

/// Lifecycle of one dispatched task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Accepted but not yet polled by the runtime
    Pending,
    /// Callback is executing
    Running,
    /// Task returned; slot may be reused
    Finished,
}

/// Tracks in-flight notification tasks per dispatch key.
///
/// Finished handles are not removed eagerly; they are replaced the next
/// time the same key is acquired.
#[derive(Debug, Default)]
pub struct DispatchTable {
    tasks: Mutex<HashMap<DispatchKey, TaskStatus>>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to claim a dispatch slot.
    ///
    /// Returns true and records a pending handle iff no handle exists
    /// for the key or the existing one is finished; returns false while
    /// a task is pending or running.
    pub fn try_acquire(&self, key: &DispatchKey) -> bool {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.get(key) {
            Some(TaskStatus::Pending | TaskStatus::Running) => false,
            Some(TaskStatus::Finished) | None => {
                tasks.insert(key.clone(), TaskStatus::Pending);
                true
            }
        }
    }

    /// Mark an acquired slot as running. Called from inside the task.
    pub fn started(&self, key: &DispatchKey) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(status) = tasks.get_mut(key) {
            *status = TaskStatus::Running;
        }
    }

    /// Release a slot once its task returned, regardless of whether the
    /// callback's effect succeeded.
    pub fn release(&self, key: &DispatchKey) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(status) = tasks.get_mut(key) {
            *status = TaskStatus::Finished;
        }
    }

    /// Current status of a key's handle, if any
    pub fn status(&self, key: &DispatchKey) -> Option<TaskStatus> {
        let tasks = self.tasks.lock().unwrap();
        tasks.get(key).copied()
    }
}
