//! Lifecycle manager for dynamically registered CSI plugins.
//!
//! Workloads running on a node bring their own storage plugin instances with
//! them: the same logical plugin name may be registered by several workloads
//! at once, instances appear and disappear at runtime, and an in-place
//! restart of a workload replaces its instance with a new process behind the
//! same name. [`CsiPluginManager`] keeps a race-free view of which instance
//! is currently authoritative for each `(role, name)` pair while all of that
//! happens asynchronously.
//!
//! Two update sources feed a single reconciliation task: push events from
//! the registry's per-role subscriptions, and a periodic full resync against
//! [`PluginRegistry::list_plugins`](strata_plugin::PluginRegistry::list_plugins)
//! that heals missed events. Other subsystems borrow the active instance
//! through [`CsiPluginManager::mounter_for`] without ever waiting on
//! reconciliation.
//!
//! # Example
//!
//! ```ignore
//! use strata_csi::{CsiManagerConfig, CsiPluginManager};
//! use strata_plugin::{PluginManager, PluginRole};
//!
//! let config = CsiManagerConfig::new(registry, factory, node_event, update_fingerprint);
//! let manager = CsiPluginManager::new(config);
//! manager.run();
//!
//! let mounter = manager.mounter_for(PluginRole::Node, "ebs.csi.example.com").await?;
//! // ... mount volumes ...
//!
//! manager.shutdown().await;
//! ```

mod config;
mod error;
mod manager;
mod table;

pub use config::{CsiManagerConfig, DEFAULT_RESYNC_PERIOD};
pub use error::MounterError;
pub use manager::CsiPluginManager;
