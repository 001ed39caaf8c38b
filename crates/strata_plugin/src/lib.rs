//! Boundary contracts for dynamic plugin management.
//!
//! A node agent hosts one plugin manager per plugin class (storage, device,
//! ...). Workloads scheduled onto the node register and deregister plugin
//! instances at runtime through the agent's plugin registry; each manager
//! watches the registry slice it cares about and supervises the matching
//! instances. This crate defines the seams those pieces meet at:
//!
//! - [`PluginDescriptor`], [`PluginRole`], [`PluginEvent`] — the data model
//!   the registry speaks.
//! - [`PluginRegistry`] — listing and change subscription.
//! - [`InstanceHandle`] / [`InstanceFactory`] — the lifecycle contract of a
//!   running plugin instance's supervisor.
//! - [`VolumeMounter`] — the mount-capable handle a healthy storage
//!   instance hands out.
//! - [`PluginManager`] — the interface the hosting agent drives managers
//!   through.

mod descriptor;
mod event;
mod instance;
mod manager;
mod registry;

pub use descriptor::{ConnectionInfo, PluginDescriptor, PluginRole};
pub use event::PluginEvent;
pub use instance::{
    InstanceError, InstanceFactory, InstanceHandle, MountRequest, NodeEvent, NodeEventFn,
    PluginFingerprint, UpdateFingerprintFn, VolumeMounter,
};
pub use manager::PluginManager;
pub use registry::{PluginRegistry, RegistryError};
