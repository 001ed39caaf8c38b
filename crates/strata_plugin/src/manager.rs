//! The interface the hosting agent drives plugin managers through.

use async_trait::async_trait;

/// A long-running manager of one class of dynamic plugins.
///
/// The agent holds several managers side by side and routes calls by
/// [`plugin_type`](Self::plugin_type). Managers carry no persistent state:
/// on restart they rebuild their view from the registry.
#[async_trait]
pub trait PluginManager: Send + Sync {
    /// Starts the manager's background reconciliation; returns immediately.
    fn run(&self);

    /// Gracefully stops the manager and every plugin instance it tracks,
    /// resolving only once teardown is complete.
    async fn shutdown(&self);

    /// Static identity tag used to route calls to the right manager.
    fn plugin_type(&self) -> &'static str;
}
