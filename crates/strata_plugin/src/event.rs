//! Registry change notifications.

use serde::{Deserialize, Serialize};

use crate::descriptor::PluginDescriptor;

/// A change notification emitted by the plugin registry for one role.
///
/// Events are advisory: a manager must tolerate missed or duplicated events
/// and periodically resync against
/// [`PluginRegistry::list_plugins`](crate::PluginRegistry::list_plugins).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "descriptor", rename_all = "kebab-case")]
pub enum PluginEvent {
    /// A workload registered a plugin occurrence.
    Registered(PluginDescriptor),
    /// A workload deregistered a plugin occurrence.
    Deregistered(PluginDescriptor),
}

impl PluginEvent {
    /// The descriptor this event is about.
    #[must_use]
    pub fn descriptor(&self) -> &PluginDescriptor {
        match self {
            PluginEvent::Registered(descriptor) | PluginEvent::Deregistered(descriptor) => {
                descriptor
            }
        }
    }

    /// The event kind as a short diagnostic label.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            PluginEvent::Registered(_) => "registered",
            PluginEvent::Deregistered(_) => "deregistered",
        }
    }
}
