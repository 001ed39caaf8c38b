//! The CSI plugin manager.
//!
//! One reconciliation task owns every table mutation. It selects over the
//! periodic resync interval, the two per-role registry subscriptions, and
//! the cancellation signal, handling exactly one of them at a time, so the
//! event-driven and timer-driven paths can never interleave. The query
//! surface and the shutdown coordinator live here too; see the module docs
//! on [`crate`] for the overall flow.

use core::time::Duration;
use std::sync::Arc;

use futures::future::join_all;
use hashbrown::HashSet;
use parking_lot::Mutex;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace, warn};

use strata_plugin::{
    InstanceFactory, InstanceHandle, NodeEventFn, PluginDescriptor, PluginEvent, PluginManager,
    PluginRegistry, PluginRole, UpdateFingerprintFn, VolumeMounter,
};

use crate::config::CsiManagerConfig;
use crate::error::MounterError;
use crate::table::{EnsureOutcome, InstanceTable};

/// State the manager object moves through. The loop itself transitions
/// running → draining → stopped; the oneshot held in `Running` resolves only
/// once the loop has fully exited.
enum Lifecycle {
    Idle,
    Running(oneshot::Receiver<()>),
    Stopped,
}

/// State shared between the manager handle and the reconciliation task.
struct Shared {
    /// Mutated only by the reconciliation loop, and by the shutdown
    /// coordinator strictly after the loop has exited. The lock is never
    /// held across an await.
    table: Mutex<InstanceTable>,
    registry: Arc<dyn PluginRegistry>,
    factory: Arc<dyn InstanceFactory>,
    node_event: NodeEventFn,
    update_fingerprint: UpdateFingerprintFn,
    resync_period: Duration,
}

/// Tracks, starts, replaces, and stops CSI plugin instances registered and
/// deregistered at runtime by workloads on the node.
///
/// Construct with [`CsiManagerConfig`], call [`run`](Self::run) once, and
/// tear down with [`shutdown`](Self::shutdown). See the crate docs for the
/// reconciliation model.
pub struct CsiPluginManager {
    shared: Arc<Shared>,
    cancel: watch::Sender<bool>,
    lifecycle: Mutex<Lifecycle>,
}

impl CsiPluginManager {
    /// Creates a manager from `config`. Nothing runs until
    /// [`run`](Self::run) is called.
    #[must_use]
    pub fn new(config: CsiManagerConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(InstanceTable::new()),
                registry: config.registry,
                factory: config.factory,
                node_event: config.node_event,
                update_fingerprint: config.update_fingerprint,
                resync_period: config.resync_period,
            }),
            cancel,
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    /// Starts the reconciliation loop on the current runtime and returns
    /// immediately. Calling `run` more than once, or after
    /// [`shutdown`](Self::shutdown), is a no-op.
    pub fn run(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            warn!("csi plugin manager already started");
            return;
        }
        let (exited_tx, exited_rx) = oneshot::channel();
        tokio::spawn(Arc::clone(&self.shared).run_loop(self.cancel.subscribe(), exited_tx));
        *lifecycle = Lifecycle::Running(exited_rx);
    }

    /// Gracefully stops the manager: signals the reconciliation loop, waits
    /// for it to confirm exit, then stops every tracked instance worker
    /// concurrently and waits for all stops to finish.
    pub async fn shutdown(&self) {
        let exited = {
            let mut lifecycle = self.lifecycle.lock();
            match core::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(exited) => Some(exited),
                Lifecycle::Idle | Lifecycle::Stopped => None,
            }
        };

        let _ = self.cancel.send(true);

        // Wait for the loop to fully exit before touching any worker, so a
        // resync or event in flight cannot race the teardown below.
        if let Some(exited) = exited {
            let _ = exited.await;
        }

        let handles = self.shared.table.lock().drain();
        if handles.is_empty() {
            return;
        }
        debug!(count = handles.len(), "stopping all tracked csi plugin instances");

        // Fan out: total shutdown latency is bounded by the slowest worker,
        // not the sum.
        let stops: Vec<_> = handles.iter().map(|handle| handle.stop()).collect();
        for (handle, result) in handles.iter().zip(join_all(stops).await) {
            if let Err(err) = result {
                warn!(
                    plugin = %handle.descriptor().name,
                    owner = %handle.owner_id(),
                    %err,
                    "csi plugin instance failed to stop cleanly during shutdown"
                );
            }
        }
    }

    /// Returns a mount-capable handle for the currently authoritative
    /// instance of `(role, name)`.
    ///
    /// Only takes the brief table lock; it never waits on the reconciliation
    /// loop's timer or event processing.
    ///
    /// # Errors
    ///
    /// [`MounterError::PluginNotFound`] when no instance is tracked, or the
    /// worker's own error when it cannot currently provide a mounter.
    pub async fn mounter_for(
        &self,
        role: PluginRole,
        name: &str,
    ) -> Result<Arc<dyn VolumeMounter>, MounterError> {
        let front = self.shared.table.lock().front_of(role, name).ok_or_else(|| {
            MounterError::PluginNotFound {
                role,
                name: name.to_string(),
            }
        })?;
        Ok(front.volume_mounter().await?)
    }
}

#[async_trait::async_trait]
impl PluginManager for CsiPluginManager {
    fn run(&self) {
        CsiPluginManager::run(self);
    }

    async fn shutdown(&self) {
        CsiPluginManager::shutdown(self).await;
    }

    fn plugin_type(&self) -> &'static str {
        "csi"
    }
}

impl Shared {
    /// The reconciliation loop: the single authority over table mutations.
    ///
    /// `tokio::time::interval` fires its first tick immediately, so a
    /// baseline resync runs at startup before the loop depends on events.
    async fn run_loop(
        self: Arc<Self>,
        mut cancel: watch::Receiver<bool>,
        exited: oneshot::Sender<()>,
    ) {
        let mut controller_events = self.registry.subscribe(PluginRole::Controller);
        let mut node_events = self.registry.subscribe(PluginRole::Node);
        let mut controller_open = true;
        let mut node_open = true;
        let mut resync = tokio::time::interval(self.resync_period);

        loop {
            tokio::select! {
                _ = resync.tick() => {
                    for role in PluginRole::ALL {
                        self.resync_role(role).await;
                    }
                }
                event = controller_events.recv(), if controller_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        trace!(role = %PluginRole::Controller, "plugin event stream closed");
                        controller_open = false;
                    }
                },
                event = node_events.recv(), if node_open => match event {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        trace!(role = %PluginRole::Node, "plugin event stream closed");
                        node_open = false;
                    }
                },
                _ = cancel.changed() => break,
            }
        }

        // Draining: no new work is started past this point. Signal full exit
        // so the shutdown coordinator can proceed.
        let _ = exited.send(());
    }

    /// Applies a single registry event to the table.
    async fn handle_event(&self, event: PluginEvent) {
        let descriptor = event.descriptor();
        trace!(
            kind = event.kind(),
            plugin = %descriptor.name,
            owner = %descriptor.owner_id,
            "dynamic plugin event"
        );

        match event {
            PluginEvent::Registered(descriptor) => self.ensure_instance(&descriptor),
            PluginEvent::Deregistered(descriptor) => self.remove_instance(&descriptor).await,
        }
    }

    /// Full reconciliation of one role against the registry's current
    /// listing: ensure every listed descriptor, then drop every tracked name
    /// the listing no longer mentions. Heals missed events at the cost of
    /// staleness bounded by the resync period.
    async fn resync_role(&self, role: PluginRole) {
        let plugins = match self.registry.list_plugins(role) {
            Ok(plugins) => plugins,
            Err(err) => {
                // Transient: wait for the next tick or event.
                warn!(%role, %err, "plugin registry listing failed, deferring resync");
                return;
            }
        };

        let mut seen: HashSet<&str> = HashSet::with_capacity(plugins.len());
        for descriptor in &plugins {
            seen.insert(descriptor.name.as_str());
            self.ensure_instance(descriptor);
        }

        // Names tracked here but absent from the listing disappeared without
        // a deregistration event. The seen set is name-granular: a stale
        // owner under a still-listed name is left for its own event.
        let orphaned = self.table.lock().detach_absent(role, &seen);
        for handle in orphaned {
            debug!(
                %role,
                plugin = %handle.descriptor().name,
                owner = %handle.owner_id(),
                "stopping csi plugin instance absent from registry"
            );
            self.stop_detached(&handle).await;
        }
    }

    /// Ensures a worker is tracked for `descriptor`, creating or replacing
    /// one as needed. A retired worker's stop is spawned off rather than
    /// awaited so reconciliation never waits on a replacement.
    fn ensure_instance(&self, descriptor: &PluginDescriptor) {
        let outcome = {
            let mut table = self.table.lock();
            table.ensure(descriptor, || self.new_worker(descriptor))
        };

        match outcome {
            EnsureOutcome::Created => {
                debug!(
                    role = %descriptor.role,
                    plugin = %descriptor.name,
                    owner = %descriptor.owner_id,
                    "detected new csi plugin instance"
                );
            }
            EnsureOutcome::Replaced { retired } => {
                debug!(
                    role = %descriptor.role,
                    plugin = %descriptor.name,
                    owner = %descriptor.owner_id,
                    "replacing csi plugin instance with changed descriptor"
                );
                tokio::spawn(async move {
                    if let Err(err) = retired.stop().await {
                        warn!(
                            plugin = %retired.descriptor().name,
                            owner = %retired.owner_id(),
                            %err,
                            "replaced csi plugin instance failed to stop cleanly"
                        );
                    }
                });
            }
            EnsureOutcome::Reconfirmed => {}
        }
    }

    /// Removes and stops every entry matching the descriptor's owner. The
    /// loop blocks until the stop completes, guaranteeing no two workers for
    /// the same owner ever run at once.
    async fn remove_instance(&self, descriptor: &PluginDescriptor) {
        let detached =
            self.table
                .lock()
                .detach_owner(descriptor.role, &descriptor.name, &descriptor.owner_id);
        for handle in detached {
            debug!(
                role = %descriptor.role,
                plugin = %descriptor.name,
                owner = %descriptor.owner_id,
                "stopping deregistered csi plugin instance"
            );
            self.stop_detached(&handle).await;
        }
    }

    /// Stops a worker already removed from the table. A stop failure is the
    /// worker's own concern; the bookkeeping has already let go of it.
    async fn stop_detached(&self, handle: &Arc<dyn InstanceHandle>) {
        if let Err(err) = handle.stop().await {
            warn!(
                plugin = %handle.descriptor().name,
                owner = %handle.owner_id(),
                %err,
                "csi plugin instance failed to stop cleanly"
            );
        }
    }

    /// Creates and starts a worker for `descriptor`, handing the
    /// pass-through callbacks along.
    fn new_worker(&self, descriptor: &PluginDescriptor) -> Arc<dyn InstanceHandle> {
        let handle = self.factory.create(
            descriptor,
            Arc::clone(&self.node_event),
            Arc::clone(&self.update_fingerprint),
        );
        handle.start();
        handle
    }
}
