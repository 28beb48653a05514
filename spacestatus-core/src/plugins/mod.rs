//! Notifier plugin system
//!
//! Plugins react to open/closed transitions of a space. The life cycle
//! has three stages: the compile-time registration table
//! ([`PluginRegistry::builtin`]), configuration resolution and
//! construction at startup ([`PluginRegistry::build`]), and runtime
//! fan-out through the [`Dispatcher`], which keeps at most one live
//! notification task per (host, plugin) pair.

pub mod chatroom;
mod dispatcher;
mod error;
pub mod microblog;
mod notifier;
pub mod phrase;
mod registry;
mod session_cache;
mod table;

pub use dispatcher::Dispatcher;
pub use error::{CredentialError, DeliveryError};
pub use notifier::{BuildFuture, Notifier, NotifierContext, PluginDescriptor, ResolvedConfig};
pub use registry::PluginRegistry;
pub use session_cache::SessionCache;
pub use table::{DispatchKey, DispatchTable, TaskStatus};
