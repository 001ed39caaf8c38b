//! Error types for the query surface.

use strata_plugin::{InstanceError, PluginRole};

/// Error obtaining a mount-capable handle from the manager.
#[derive(Debug, thiserror::Error)]
pub enum MounterError {
    /// No instance is tracked for the requested role and name.
    #[error("no tracked instance for {role} plugin '{name}'")]
    PluginNotFound {
        /// The requested capability class.
        role: PluginRole,
        /// The requested logical plugin name.
        name: String,
    },

    /// The tracked instance could not provide a mounter (typically not yet
    /// healthy).
    #[error(transparent)]
    Instance(#[from] InstanceError),
}
