//! The plugin registry surface a manager consumes.

use tokio::sync::mpsc;

use crate::descriptor::{PluginDescriptor, PluginRole};
use crate::event::PluginEvent;

/// Errors reported by a [`PluginRegistry`].
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry could not serve a listing. Managers treat this as
    /// transient and retry on the next resync tick.
    #[error("plugin registry unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative store of plugin descriptors and source of change events.
///
/// The registry is the sole source of truth across agent restarts: managers
/// carry no persistent state and rebuild their view from
/// [`list_plugins`](Self::list_plugins) on startup. Implementations own the
/// storage and notification mechanics; this trait only fixes the surface a
/// manager depends on.
pub trait PluginRegistry: Send + Sync {
    /// Current descriptors registered under `role`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unavailable`] when the listing cannot be
    /// served; callers retry rather than treat this as fatal.
    fn list_plugins(&self, role: PluginRole) -> Result<Vec<PluginDescriptor>, RegistryError>;

    /// Subscribes to registration and deregistration events for `role`.
    ///
    /// The returned channel closes when the registry shuts down. Delivery is
    /// best-effort; subscribers reconcile against
    /// [`list_plugins`](Self::list_plugins) to heal missed events.
    fn subscribe(&self, role: PluginRole) -> mpsc::Receiver<PluginEvent>;
}
