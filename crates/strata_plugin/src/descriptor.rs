//! Plugin identity and connection metadata.

use core::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// PluginRole
// ─────────────────────────────────────────────────────────────────────────────

/// The capability class a plugin instance offers.
///
/// A monolith plugin process may serve both roles at once; it then registers
/// under each role separately and is tracked as two independent instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginRole {
    /// Cluster-facing volume lifecycle operations (create, attach, detach).
    Controller,
    /// Per-node staging and publishing of volumes.
    Node,
}

impl PluginRole {
    /// Both roles, in the order resync walks them.
    pub const ALL: [PluginRole; 2] = [PluginRole::Controller, PluginRole::Node];

    /// The registry identifier for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginRole::Controller => "controller",
            PluginRole::Node => "node",
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PluginDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// How the agent reaches a running plugin process.
///
/// Opaque to the lifecycle core: instance workers consume it to dial the
/// plugin, and a changed value is what makes an occurrence a *replacement*.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Filesystem path of the plugin's gRPC socket.
    pub socket_path: String,
    /// Address the workload exposes for proxied access, if any.
    pub proxy_address: String,
}

/// One observed occurrence of a plugin, as reported by the registry.
///
/// Descriptors are immutable once observed: a descriptor with different
/// contents for the same `(name, owner_id)` pair describes a new underlying
/// process, not a mutation of the old one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Logical plugin identity (e.g. `"ebs.csi.aws.com"`).
    pub name: String,
    /// The capability class this occurrence offers.
    pub role: PluginRole,
    /// The workload instance that brought this occurrence into existence.
    /// Removal of the owner implies removal of the occurrence.
    pub owner_id: String,
    /// Connection metadata, passed through to the instance worker.
    pub connection: ConnectionInfo,
}
