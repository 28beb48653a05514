//! Fan-out of state-change events to notifier plugins
//!
//! The dispatcher is the facade the event source calls on every
//! observed open/closed transition. Each accepted (host, plugin) pair
//! runs on its own task; `notify` returns once all tasks are started
//! or skipped, never waiting for a callback to finish.

use std::sync::Arc;

use tracing::{error, info, warn};

use super::registry::PluginRegistry;
use super::table::{DispatchKey, DispatchTable};

/// Dispatches state-change events to all registered plugins
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    table: Arc<DispatchTable>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            table: Arc::new(DispatchTable::new()),
        }
    }

    /// Notify every plugin configured for `host` of a state transition.
    ///
    /// A plugin whose previous task for this host is still live is
    /// skipped with a warning; the event is dropped for that plugin
    /// only. Panics inside a callback are contained to its task and the
    /// dispatch slot is released regardless. Must be called from within
    /// a tokio runtime.
    pub fn notify(&self, host: &str, open: bool) {
        for plugin in self.registry.plugins() {
            if !plugin.configured_hosts().contains(host) {
                continue;
            }

            let key = DispatchKey::new(host, plugin.name());
            if !self.table.try_acquire(&key) {
                warn!(%key, "state change dropped, previous notification still running");
                continue;
            }
            info!(%key, open, "state change notification started");

            let plugin = Arc::clone(plugin);
            let table = Arc::clone(&self.table);
            let host = host.to_string();
            tokio::spawn(async move {
                table.started(&key);

                let callback = tokio::spawn({
                    let plugin = Arc::clone(&plugin);
                    let host = host.clone();
                    async move { plugin.on_state_change(&host, open).await }
                });
                if let Err(e) = callback.await
                    && e.is_panic()
                {
                    error!(host, plugin = plugin.name(), "notifier panicked during state change");
                }

                table.release(&key);
            });
        }
    }

    /// The dispatch table, for status introspection
    pub fn table(&self) -> &DispatchTable {
        &self.table
    }
}
