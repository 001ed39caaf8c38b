//! Dynamic storage plugin lifecycle management for cluster-node agents.
//!

/// Boundary contracts: descriptors, the registry surface, the instance
/// worker lifecycle contract, and the plugin manager routing interface.
pub use strata_plugin;

/// The CSI plugin lifecycle manager: tracking table, reconciliation loop,
/// query surface, and shutdown coordination.
pub use strata_csi;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use strata_csi::{CsiManagerConfig, CsiPluginManager, MounterError};
    pub use strata_plugin::{
        InstanceError, InstanceFactory, InstanceHandle, MountRequest, PluginDescriptor,
        PluginEvent, PluginManager, PluginRegistry, PluginRole, RegistryError, VolumeMounter,
    };
}
