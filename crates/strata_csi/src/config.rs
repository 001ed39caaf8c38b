//! Construction-time configuration for the CSI plugin manager.

use core::time::Duration;
use std::sync::Arc;

use strata_plugin::{InstanceFactory, NodeEventFn, PluginRegistry, UpdateFingerprintFn};

/// Interval between full resyncs against the registry, used when none is
/// configured. Resync bounds the staleness window left by missed events.
pub const DEFAULT_RESYNC_PERIOD: Duration = Duration::from_secs(30);

/// Configuration for [`CsiPluginManager`](crate::CsiPluginManager).
///
/// The registry handle, instance factory, and the two pass-through callbacks
/// are required; the resync period defaults to [`DEFAULT_RESYNC_PERIOD`].
pub struct CsiManagerConfig {
    pub(crate) registry: Arc<dyn PluginRegistry>,
    pub(crate) factory: Arc<dyn InstanceFactory>,
    pub(crate) node_event: NodeEventFn,
    pub(crate) update_fingerprint: UpdateFingerprintFn,
    pub(crate) resync_period: Duration,
}

impl CsiManagerConfig {
    /// Creates a configuration with the default resync period.
    ///
    /// `node_event` and `update_fingerprint` are handed through to instance
    /// workers untouched; the manager itself never invokes them.
    #[must_use]
    pub fn new(
        registry: Arc<dyn PluginRegistry>,
        factory: Arc<dyn InstanceFactory>,
        node_event: NodeEventFn,
        update_fingerprint: UpdateFingerprintFn,
    ) -> Self {
        Self {
            registry,
            factory,
            node_event,
            update_fingerprint,
            resync_period: DEFAULT_RESYNC_PERIOD,
        }
    }

    /// Sets the interval between full resyncs against the registry.
    ///
    /// A zero period falls back to [`DEFAULT_RESYNC_PERIOD`].
    #[must_use]
    pub fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync_period = if period.is_zero() {
            DEFAULT_RESYNC_PERIOD
        } else {
            period
        };
        self
    }
}
