//! spacestatus-core: Multi-tenant space status backend
//!
//! This crate provides the building blocks of the status service:
//!
//! - **Configuration** - [`config::AppConfig`] for the hosts and plugin
//!   tables, plus layered per-plugin resolution via [`config::resolve`]
//! - **Status store** - [`store::StatusStore`] holding each host's
//!   SpaceAPI-style JSON document with file persistence
//! - **Notifier plugins** - [`plugins::PluginRegistry`] and
//!   [`plugins::Dispatcher`] for fanning open/closed transitions out to
//!   the built-in microblog and chat room notifiers
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use spacestatus_core::config::AppConfig;
//! use spacestatus_core::plugins::{Dispatcher, NotifierContext, PluginRegistry};
//! use spacestatus_core::store::StatusStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let data_dir = Path::new("/var/lib/spacestatus");
//! let config = AppConfig::load(Path::new("config.toml"), data_dir)?;
//! let store = Arc::new(StatusStore::load(&config, data_dir).await?);
//!
//! let ctx = NotifierContext {
//!     store: Arc::clone(&store),
//!     cache_dir: data_dir.join("cache"),
//! };
//! let registry = PluginRegistry::build(PluginRegistry::builtin(), &config, ctx).await?;
//! let dispatcher = Dispatcher::new(Arc::new(registry));
//!
//! if store.set_open_state("status.example.org", true).await? {
//!     store.commit("status.example.org").await?;
//!     dispatcher.notify("status.example.org", true);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod plugins;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigValidationError};
pub use plugins::{Dispatcher, Notifier, NotifierContext, PluginRegistry};
pub use store::{StatusStore, StoreError};
