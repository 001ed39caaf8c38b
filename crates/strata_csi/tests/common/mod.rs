//! Shared fakes for manager integration tests: an in-memory registry, a
//! recording instance factory, and workers that track their lifecycle.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use core::time::Duration;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use strata_csi::{CsiManagerConfig, CsiPluginManager};
use strata_plugin::{
    ConnectionInfo, InstanceError, InstanceFactory, InstanceHandle, MountRequest, NodeEvent,
    NodeEventFn, PluginDescriptor, PluginEvent, PluginFingerprint, PluginRegistry, PluginRole,
    RegistryError, UpdateFingerprintFn, VolumeMounter,
};

// ─────────────────────────────────────────────────────────────────────────────
// FakeRegistry
// ─────────────────────────────────────────────────────────────────────────────

/// In-memory registry with settable listings, injectable listing failures,
/// and broadcast of emitted events to all matching subscribers.
#[derive(Default)]
pub struct FakeRegistry {
    plugins: Mutex<Vec<PluginDescriptor>>,
    fail_listing: AtomicBool,
    subscribers: Mutex<Vec<(PluginRole, mpsc::Sender<PluginEvent>)>>,
}

impl FakeRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces the registry's current listing (all roles at once).
    pub fn set_plugins(&self, plugins: Vec<PluginDescriptor>) {
        *self.plugins.lock() = plugins;
    }

    pub fn set_listing_failure(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Delivers an event to every subscriber of the descriptor's role.
    /// Delivery failures (e.g. after manager shutdown) are ignored, matching
    /// a real registry's best-effort notification.
    pub async fn emit(&self, event: PluginEvent) {
        let role = event.descriptor().role;
        let senders: Vec<_> = self
            .subscribers
            .lock()
            .iter()
            .filter(|(subscribed, _)| *subscribed == role)
            .map(|(_, sender)| sender.clone())
            .collect();
        for sender in senders {
            let _ = sender.send(event.clone()).await;
        }
    }

    /// Waits until `count` subscriptions exist, i.e. the manager's loop is
    /// up and listening.
    pub async fn wait_for_subscribers(&self, count: usize) {
        wait_until("registry subscribers", || {
            self.subscribers.lock().len() >= count
        })
        .await;
    }
}

impl PluginRegistry for FakeRegistry {
    fn list_plugins(&self, role: PluginRole) -> Result<Vec<PluginDescriptor>, RegistryError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("injected failure".to_string()));
        }
        Ok(self
            .plugins
            .lock()
            .iter()
            .filter(|descriptor| descriptor.role == role)
            .cloned()
            .collect())
    }

    fn subscribe(&self, role: PluginRole) -> mpsc::Receiver<PluginEvent> {
        let (sender, receiver) = mpsc::channel(32);
        self.subscribers.lock().push((role, sender));
        receiver
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FakeWorker / FakeMounter
// ─────────────────────────────────────────────────────────────────────────────

pub struct FakeWorker {
    descriptor: PluginDescriptor,
    started: AtomicBool,
    stopped: AtomicBool,
    stop_count: AtomicUsize,
    stop_delay: Duration,
    mount_log: Arc<Mutex<Vec<String>>>,
}

impl FakeWorker {
    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstanceHandle for FakeWorker {
    fn owner_id(&self) -> &str {
        &self.descriptor.owner_id
    }

    fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn needs_replacement(&self, incoming: &PluginDescriptor) -> bool {
        incoming.connection != self.descriptor.connection
    }

    async fn stop(&self) -> Result<(), InstanceError> {
        if !self.stop_delay.is_zero() {
            sleep(self.stop_delay).await;
        }
        self.stopped.store(true, Ordering::SeqCst);
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn volume_mounter(&self) -> Result<Arc<dyn VolumeMounter>, InstanceError> {
        if self.stopped() {
            return Err(InstanceError::NotReady("worker stopped".to_string()));
        }
        Ok(Arc::new(FakeMounter {
            socket_path: self.descriptor.connection.socket_path.clone(),
            mount_log: Arc::clone(&self.mount_log),
        }))
    }
}

/// Mounter that records which worker (by socket path) served each mount.
#[derive(Debug)]
pub struct FakeMounter {
    socket_path: String,
    mount_log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl VolumeMounter for FakeMounter {
    async fn mount_volume(&self, _request: &MountRequest) -> Result<(), InstanceError> {
        self.mount_log.lock().push(self.socket_path.clone());
        Ok(())
    }

    async fn unmount_volume(
        &self,
        _volume_id: &str,
        _target_path: &Path,
    ) -> Result<(), InstanceError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FakeFactory
// ─────────────────────────────────────────────────────────────────────────────

/// Factory that records every worker it creates.
#[derive(Default)]
pub struct FakeFactory {
    created: Mutex<Vec<Arc<FakeWorker>>>,
    stop_delay: Mutex<Duration>,
    mount_log: Arc<Mutex<Vec<String>>>,
}

impl FakeFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Stop latency applied to workers created from here on.
    pub fn set_stop_delay(&self, delay: Duration) {
        *self.stop_delay.lock() = delay;
    }

    pub fn created(&self) -> Vec<Arc<FakeWorker>> {
        self.created.lock().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().len()
    }

    /// Socket paths recorded by mounters, in mount order.
    pub fn mount_log(&self) -> Vec<String> {
        self.mount_log.lock().clone()
    }
}

impl InstanceFactory for FakeFactory {
    fn create(
        &self,
        descriptor: &PluginDescriptor,
        _node_event: NodeEventFn,
        _update_fingerprint: UpdateFingerprintFn,
    ) -> Arc<dyn InstanceHandle> {
        let worker = Arc::new(FakeWorker {
            descriptor: descriptor.clone(),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            stop_count: AtomicUsize::new(0),
            stop_delay: *self.stop_delay.lock(),
            mount_log: Arc::clone(&self.mount_log),
        });
        self.created.lock().push(Arc::clone(&worker));
        worker
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn descriptor(role: PluginRole, name: &str, owner: &str, socket: &str) -> PluginDescriptor {
    PluginDescriptor {
        name: name.to_string(),
        role,
        owner_id: owner.to_string(),
        connection: ConnectionInfo {
            socket_path: socket.to_string(),
            proxy_address: String::new(),
        },
    }
}

pub fn manager(
    registry: &Arc<FakeRegistry>,
    factory: &Arc<FakeFactory>,
    resync_period: Duration,
) -> CsiPluginManager {
    let config = CsiManagerConfig::new(
        Arc::clone(registry) as Arc<dyn PluginRegistry>,
        Arc::clone(factory) as Arc<dyn InstanceFactory>,
        Arc::new(|_: NodeEvent| {}),
        Arc::new(|_: &str, _: PluginFingerprint| {}),
    )
    .with_resync_period(resync_period);
    CsiPluginManager::new(config)
}

/// Polls `condition` until it holds, panicking after five seconds.
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        sleep(Duration::from_millis(10)).await;
    }
}
