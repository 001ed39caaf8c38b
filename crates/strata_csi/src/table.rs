//! The instance tracking table.
//!
//! In-memory index mapping role → plugin name → an ordered group of tracked
//! instance workers, most-recently-confirmed first. Groups hold one entry
//! per distinct owner; the front entry is the one the query surface hands
//! out. Mutation is reserved to the reconciliation loop (and the shutdown
//! coordinator once the loop has exited); the table itself stays lock-free
//! and the caller wraps it in the synchronization it needs.
//!
//! Detach operations hand removed entries back instead of stopping workers
//! in place, so the caller can release its lock before awaiting teardown.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use strata_plugin::{InstanceHandle, PluginDescriptor, PluginRole};

/// What [`InstanceTable::ensure`] did for a descriptor.
pub(crate) enum EnsureOutcome {
    /// No entry existed for the owner; a new worker was inserted at the
    /// front of the group.
    Created,
    /// The owner's existing entry matched; it was promoted to the front and
    /// no worker was created.
    Reconfirmed,
    /// The owner's worker judged the new descriptor a different underlying
    /// process; a fresh worker took its slot and the old one was detached.
    Replaced {
        /// The worker that was swapped out. The table no longer references
        /// it; stopping it is the caller's responsibility.
        retired: Arc<dyn InstanceHandle>,
    },
}

/// Ordered group of workers for one `(role, name)` pair, front first.
///
/// Groups are tiny (more than one entry only during a rolling replacement of
/// the owning workload), so a `Vec` with remove-and-reinsert promotion beats
/// anything pointer-based.
#[derive(Default)]
struct InstanceGroup {
    entries: Vec<Arc<dyn InstanceHandle>>,
}

impl InstanceGroup {
    fn position_of(&self, owner_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.owner_id() == owner_id)
    }

    fn promote(&mut self, index: usize) {
        if index > 0 {
            let entry = self.entries.remove(index);
            self.entries.insert(0, entry);
        }
    }
}

/// Per-role, per-name index of running instance workers.
#[derive(Default)]
pub(crate) struct InstanceTable {
    groups: HashMap<PluginRole, HashMap<String, InstanceGroup>>,
}

impl InstanceTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ensures a worker is tracked for `descriptor`, creating one through
    /// `create` only when the owner is new to the group or its existing
    /// worker asks to be replaced. The affected entry ends up at the front
    /// of its group in every case.
    pub(crate) fn ensure<F>(&mut self, descriptor: &PluginDescriptor, create: F) -> EnsureOutcome
    where
        F: FnOnce() -> Arc<dyn InstanceHandle>,
    {
        let group = self
            .groups
            .entry(descriptor.role)
            .or_default()
            .entry(descriptor.name.clone())
            .or_default();

        match group.position_of(&descriptor.owner_id) {
            Some(index) => {
                if group.entries[index].needs_replacement(descriptor) {
                    // Swap in place so readers never observe an empty slot.
                    let retired = core::mem::replace(&mut group.entries[index], create());
                    group.promote(index);
                    EnsureOutcome::Replaced { retired }
                } else {
                    group.promote(index);
                    EnsureOutcome::Reconfirmed
                }
            }
            None => {
                group.entries.insert(0, create());
                EnsureOutcome::Created
            }
        }
    }

    /// Detaches every entry under `(role, name)` belonging to `owner_id`
    /// (normally exactly one). Returns nothing when nothing matches.
    pub(crate) fn detach_owner(
        &mut self,
        role: PluginRole,
        name: &str,
        owner_id: &str,
    ) -> Vec<Arc<dyn InstanceHandle>> {
        let Some(by_name) = self.groups.get_mut(&role) else {
            return Vec::new();
        };
        let Some(group) = by_name.get_mut(name) else {
            return Vec::new();
        };

        let mut detached = Vec::new();
        group.entries.retain(|entry| {
            if entry.owner_id() == owner_id {
                detached.push(Arc::clone(entry));
                false
            } else {
                true
            }
        });

        if group.entries.is_empty() {
            by_name.remove(name);
        }
        detached
    }

    /// Detaches every entry of every `role` group whose name is absent from
    /// `seen`, in resync order.
    ///
    /// Membership is checked at name granularity only: a stale owner under a
    /// name that is still listed survives resync and is removed solely by
    /// its own deregistration event.
    pub(crate) fn detach_absent(
        &mut self,
        role: PluginRole,
        seen: &HashSet<&str>,
    ) -> Vec<Arc<dyn InstanceHandle>> {
        let Some(by_name) = self.groups.get_mut(&role) else {
            return Vec::new();
        };

        let mut detached = Vec::new();
        by_name.retain(|name, group| {
            if seen.contains(name.as_str()) {
                true
            } else {
                detached.append(&mut group.entries);
                false
            }
        });
        detached
    }

    /// The current front entry for `(role, name)`, if any.
    pub(crate) fn front_of(
        &self,
        role: PluginRole,
        name: &str,
    ) -> Option<Arc<dyn InstanceHandle>> {
        self.groups
            .get(&role)?
            .get(name)?
            .entries
            .first()
            .cloned()
    }

    /// Detaches every tracked entry across all roles, emptying the table.
    pub(crate) fn drain(&mut self) -> Vec<Arc<dyn InstanceHandle>> {
        let mut detached = Vec::new();
        for (_, by_name) in self.groups.drain() {
            for (_, mut group) in by_name {
                detached.append(&mut group.entries);
            }
        }
        detached
    }
}
