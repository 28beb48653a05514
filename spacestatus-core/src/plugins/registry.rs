//! Plugin registry - resolves configuration and owns the notifier set
//!
//! Built once at process start and never mutated afterwards. A
//! required-key validation failure for any plugin aborts the whole
//! build; a half-initialized plugin set is worse than a clear startup
//! failure. Soft setup failures (bad credentials for one host) only
//! shrink that plugin's configured host set.

use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, ConfigValidationError, resolve};

use super::notifier::{Notifier, NotifierContext, PluginDescriptor};
use super::{chatroom, microblog};

/// The process-wide owner of all constructed notifier plugins
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Notifier>>,
}

impl PluginRegistry {
    /// The compile-time registration table of available plugins.
    pub fn builtin() -> Vec<PluginDescriptor> {
        vec![microblog::descriptor(), chatroom::descriptor()]
    }

    /// Resolve configuration and construct every descriptor's plugin.
    ///
    /// Fails fast on the first plugin whose required configuration is
    /// incomplete; nothing is partially registered in that case.
    pub async fn build(
        descriptors: Vec<PluginDescriptor>,
        config: &AppConfig,
        ctx: NotifierContext,
    ) -> Result<Self, ConfigValidationError> {
        let mut plugins: Vec<Arc<dyn Notifier>> = Vec::with_capacity(descriptors.len());

        for descriptor in descriptors {
            let resolved = resolve(
                descriptor.name,
                descriptor.defaults.as_ref(),
                &config.plugin_global(descriptor.name),
                &config.plugin_host_fragments(descriptor.name),
                descriptor.required,
            )?;

            let plugin = (descriptor.build)(resolved, ctx.clone()).await;
            info!(
                plugin = descriptor.name,
                hosts = plugin.configured_hosts().len(),
                "plugin loaded"
            );
            plugins.push(plugin);
        }

        Ok(Self { plugins })
    }

    /// Build a registry directly from constructed plugins; intended for
    /// embedding and tests.
    pub fn from_plugins(plugins: Vec<Arc<dyn Notifier>>) -> Self {
        Self { plugins }
    }

    /// All registered plugins
    pub fn plugins(&self) -> &[Arc<dyn Notifier>] {
        &self.plugins
    }

    /// Look up a plugin by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Notifier>> {
        self.plugins.iter().find(|plugin| plugin.name() == name)
    }

    /// Number of registered plugins
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
