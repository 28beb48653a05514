//! Notifier plugin interface and registration table types

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use toml::Value;

use crate::store::StatusStore;

/// Effective per-host configuration produced by the resolver
pub type ResolvedConfig = BTreeMap<String, Value>;

/// A notifier reacting to open/closed transitions for one or more hosts.
///
/// Construction (via [`PluginDescriptor::build`]) performs all config
/// resolution and external-resource setup; afterwards the instance is
/// immutable and shared across dispatch tasks. `on_state_change` must
/// contain its own failures: it is only invoked from a dispatch task
/// and nothing above it inspects the outcome.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Stable plugin name, used as config lookup and dispatch key
    fn name(&self) -> &'static str;

    /// Hosts that passed resolution and setup
    fn configured_hosts(&self) -> &HashSet<String>;

    /// React to an open/closed transition for one host
    async fn on_state_change(&self, host: &str, open: bool);
}

/// Shared resources handed to plugins at construction
#[derive(Clone)]
pub struct NotifierContext {
    /// Read access to the current status documents
    pub store: Arc<StatusStore>,
    /// Directory for per-host session caches
    pub cache_dir: PathBuf,
}

/// Future returned by a plugin's build function
pub type BuildFuture = Pin<Box<dyn Future<Output = Arc<dyn Notifier>> + Send>>;

/// Identity and construction recipe of one plugin implementation.
///
/// Descriptors are created once at process start by the registration
/// table ([`crate::plugins::PluginRegistry::builtin`]) and consumed by
/// the registry build. The build function receives only configuration
/// that already passed required-key validation; setup failures inside
/// it (bad credentials, unreachable service) are soft and drop the
/// affected host, never the process.
pub struct PluginDescriptor {
    /// Stable name, used for config lookup and dispatch-table keys
    pub name: &'static str,
    /// Default configuration fragment layered under host config
    pub defaults: Option<Value>,
    /// Dotted key paths that must resolve for every enabled host
    pub required: &'static [&'static str],
    /// Constructor running per-host setup on resolved configuration
    pub build: fn(ResolvedConfig, NotifierContext) -> BuildFuture,
}
