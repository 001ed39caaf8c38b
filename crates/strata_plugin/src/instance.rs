//! The instance worker lifecycle contract.
//!
//! An instance worker is the long-lived supervisor of one running plugin
//! occurrence: it owns the process connection, probes health, and retries on
//! its own schedule. How it does any of that is its own business — a manager
//! only drives the lifecycle methods defined here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::PluginDescriptor;

// ─────────────────────────────────────────────────────────────────────────────
// Pass-through callbacks
// ─────────────────────────────────────────────────────────────────────────────

/// A node-level event a worker reports upward (health transitions and the
/// like). Managers pass the emitter through to workers untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEvent {
    /// The subsystem the event originates from (e.g. `"storage"`).
    pub subsystem: String,
    /// Human-readable event message.
    pub message: String,
}

/// Fingerprint data a worker publishes for its plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginFingerprint {
    /// Whether the plugin currently answers health probes.
    pub healthy: bool,
    /// Probe detail, empty when healthy.
    pub health_description: String,
}

/// Callback workers use to surface node events.
pub type NodeEventFn = Arc<dyn Fn(NodeEvent) + Send + Sync>;

/// Callback workers use to publish fingerprint updates, keyed by plugin name.
pub type UpdateFingerprintFn = Arc<dyn Fn(&str, PluginFingerprint) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors an instance worker reports across the lifecycle contract.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    /// The supervised plugin is not (yet) able to serve requests.
    #[error("plugin instance is not ready: {0}")]
    NotReady(String),

    /// The worker could not stop its underlying resources cleanly.
    #[error("plugin instance failed to stop: {0}")]
    StopFailed(String),

    /// A mount or unmount operation failed.
    #[error("volume operation failed: {0}")]
    MountFailed(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// VolumeMounter
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for publishing a volume onto the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// The volume to publish.
    pub volume_id: String,
    /// Node-local path the volume is published at.
    pub target_path: PathBuf,
    /// Whether the volume is published read-only.
    pub read_only: bool,
}

/// Mount-capable handle obtained from a healthy instance worker.
///
/// Mount mechanics are out of the manager's scope; callers obtain a mounter
/// through the manager's query surface and talk to the worker directly.
#[async_trait]
pub trait VolumeMounter: Send + Sync + core::fmt::Debug {
    /// Publishes a volume at the requested target path.
    async fn mount_volume(&self, request: &MountRequest) -> Result<(), InstanceError>;

    /// Unpublishes the volume at `target_path`.
    async fn unmount_volume(&self, volume_id: &str, target_path: &Path)
    -> Result<(), InstanceError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// InstanceHandle / InstanceFactory
// ─────────────────────────────────────────────────────────────────────────────

/// Supervisor of one running plugin occurrence.
///
/// Lifecycle, from the manager's point of view:
///
/// 1. [`start`](Self::start) — begin supervising; returns immediately, the
///    worker becomes healthy asynchronously on its own.
/// 2. [`needs_replacement`](Self::needs_replacement) — consulted when the
///    registry re-reports the same `(name, owner)` with a new descriptor.
/// 3. [`stop`](Self::stop) — graceful teardown, resolving only once the
///    worker is fully stopped.
#[async_trait]
pub trait InstanceHandle: Send + Sync {
    /// The workload instance this occurrence belongs to.
    fn owner_id(&self) -> &str;

    /// The descriptor this worker was created from.
    fn descriptor(&self) -> &PluginDescriptor;

    /// Begins supervising the plugin. Must not block; the worker runs as its
    /// own task from here on.
    fn start(&self);

    /// Whether `incoming` describes a different underlying process than the
    /// one this worker supervises, requiring a fresh worker.
    fn needs_replacement(&self, incoming: &PluginDescriptor) -> bool;

    /// Stops the worker, resolving once teardown is complete.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::StopFailed`] when underlying resources could
    /// not be released; the caller's bookkeeping must still treat the worker
    /// as stopped.
    async fn stop(&self) -> Result<(), InstanceError>;

    /// A mount-capable handle for the supervised plugin.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceError::NotReady`] while the plugin has not yet
    /// passed its health probes.
    async fn volume_mounter(&self) -> Result<Arc<dyn VolumeMounter>, InstanceError>;
}

/// Creates instance workers from registry descriptors.
///
/// Factories receive the node-event and fingerprint callbacks so workers can
/// report upward without the manager mediating.
pub trait InstanceFactory: Send + Sync {
    /// Creates a worker for `descriptor`. The worker is returned un-started;
    /// the manager calls [`InstanceHandle::start`] once it is tracked.
    fn create(
        &self,
        descriptor: &PluginDescriptor,
        node_event: NodeEventFn,
        update_fingerprint: UpdateFingerprintFn,
    ) -> Arc<dyn InstanceHandle>;
}
