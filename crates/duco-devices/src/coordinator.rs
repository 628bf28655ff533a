//! Refresh coordinator.
//!
//! The coordinator owns the transport and the address registry of one Duco
//! box. Entities declare the registers they display at attach time; the
//! coordinator then reads all of them periodically in one batched cycle and
//! publishes the resulting [`RegisterSnapshot`].
//!
//! ```text
//! Idle ──tick──→ Refreshing ──┬─→ Published ──→ Idle
//!                             └─→ Failed ─────→ Idle
//! ```
//!
//! Only one refresh runs at a time. A tick that arrives while a refresh is in
//! flight is skipped, and a failed cycle is retried on the next tick only.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use duco_core::{
    AccessClass, AddressRegistry, DucoEvent, Error, EventBus, EventBusReceiver, RegisterAddress,
    RegisterSnapshot, RegisterTransport, Result, SharedTransport, TypedRegister,
};

/// Event source name used for everything the coordinator publishes.
const EVENT_SOURCE: &str = "duco.coordinator";

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefreshOutcome {
    /// A new snapshot is current
    Published { values: usize, missed_runs: usize },
    /// The bus was unreachable; the previous snapshot is kept
    Failed { reason: String },
    /// Another refresh was already in flight
    Skipped,
    /// The coordinator shut down before the refresh completed
    Cancelled,
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published {
                values,
                missed_runs,
            } => write!(f, "published {} values ({} missed runs)", values, missed_runs),
            Self::Failed { reason } => write!(f, "failed: {}", reason),
            Self::Skipped => f.write_str("skipped"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Periodic refresher for one Duco box.
pub struct Coordinator {
    transport: SharedTransport,
    registry: RwLock<AddressRegistry>,
    current: RwLock<Option<Arc<RegisterSnapshot>>>,
    last_update_success: AtomicBool,
    /// Held for the duration of a refresh
    refresh_lock: tokio::sync::Mutex<()>,
    update_interval: Duration,
    event_bus: EventBus,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator with its own event bus.
    pub fn new(transport: SharedTransport, update_interval: Duration) -> Self {
        Self::with_event_bus(transport, update_interval, EventBus::with_name("duco"))
    }

    /// Create a coordinator publishing on an existing event bus.
    pub fn with_event_bus(
        transport: SharedTransport,
        update_interval: Duration,
        event_bus: EventBus,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            transport,
            registry: RwLock::new(AddressRegistry::new()),
            current: RwLock::new(None),
            last_update_success: AtomicBool::new(false),
            refresh_lock: tokio::sync::Mutex::new(()),
            update_interval,
            event_bus,
            shutdown,
            task: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &dyn RegisterTransport {
        self.transport.as_ref()
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to coordinator events.
    pub fn subscribe(&self) -> EventBusReceiver {
        self.event_bus.subscribe()
    }

    /// Add an address to every future refresh.
    pub fn declare_interest(&self, address: RegisterAddress, class: AccessClass) {
        if self.registry.write().declare_interest(address, class) {
            debug!("Declared interest in {} register {}", class, address);
        }
    }

    /// Declare the address of `register` for the node at `base`.
    ///
    /// Write-only registers are never read and are not declared.
    pub fn attach<V>(&self, register: &TypedRegister<V>, base: RegisterAddress) {
        if register.is_readable() {
            self.declare_interest(register.address(base), register.class());
        }
    }

    /// Number of transport calls one refresh currently issues.
    pub fn planned_calls(&self) -> usize {
        self.registry.read().plan().call_count()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Option<Arc<RegisterSnapshot>> {
        self.current.read().clone()
    }

    /// Whether the most recent refresh published a snapshot.
    pub fn last_update_success(&self) -> bool {
        self.last_update_success.load(Ordering::SeqCst)
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_lock.try_lock().is_err()
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Decode `register` for the node at `base` from the latest snapshot.
    pub fn read<V>(&self, register: &TypedRegister<V>, base: RegisterAddress) -> Option<V> {
        self.current
            .read()
            .as_ref()
            .and_then(|snapshot| register.read_from(snapshot, base))
    }

    /// Write a typed value straight to the bus.
    ///
    /// The value is encoded first; a value without raw representation fails
    /// with [`Error::NotWritable`] and issues no transport call.
    pub async fn write<V: fmt::Debug>(
        &self,
        register: &TypedRegister<V>,
        base: RegisterAddress,
        value: &V,
    ) -> Result<()> {
        let raw = register.encode(value)?;
        register.write(self.transport.as_ref(), base, value).await?;
        self.event_bus.publish_with_source(
            DucoEvent::RegisterWritten {
                address: register.address(base),
                value: raw,
                timestamp: chrono::Utc::now().timestamp_millis(),
            },
            EVENT_SOURCE,
        );
        Ok(())
    }

    /// Run one refresh cycle.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self.is_shut_down() {
            return RefreshOutcome::Cancelled;
        }
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("Refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        let plan = self.registry.read().plan();
        let mut shutdown = self.shutdown.subscribe();
        let result = tokio::select! {
            result = plan.execute(self.transport.as_ref()) => result,
            _ = shutdown.wait_for(|stopped| *stopped) => {
                debug!("Refresh abandoned on shutdown");
                return RefreshOutcome::Cancelled;
            }
        };

        // Publish under the write lock; `shutdown` takes it after raising its flag
        let mut current = self.current.write();
        if self.is_shut_down() {
            return RefreshOutcome::Cancelled;
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        match result {
            Ok(snapshot) => {
                let values = snapshot.total_len();
                let missed_runs = snapshot.missed_runs().len();
                *current = Some(Arc::new(snapshot));
                self.last_update_success.store(true, Ordering::SeqCst);
                debug!(
                    "Published snapshot with {} values in {} calls",
                    values,
                    plan.call_count()
                );
                self.event_bus.publish_with_source(
                    DucoEvent::SnapshotPublished {
                        values,
                        missed_runs,
                        timestamp,
                    },
                    EVENT_SOURCE,
                );
                RefreshOutcome::Published {
                    values,
                    missed_runs,
                }
            }
            Err(e) => {
                self.last_update_success.store(false, Ordering::SeqCst);
                warn!("Refresh failed: {}", e);
                let reason = e.to_string();
                self.event_bus.publish_with_source(
                    DucoEvent::RefreshFailed {
                        reason: reason.clone(),
                        timestamp,
                    },
                    EVENT_SOURCE,
                );
                RefreshOutcome::Failed { reason }
            }
        }
    }

    /// Initial refresh at setup. An error means setup is not ready.
    pub async fn first_refresh(&self) -> Result<Arc<RegisterSnapshot>> {
        match self.refresh().await {
            RefreshOutcome::Published { .. } => self
                .snapshot()
                .ok_or_else(|| Error::TransportUnreachable("no snapshot published".to_string())),
            RefreshOutcome::Failed { reason } => Err(Error::TransportUnreachable(reason)),
            RefreshOutcome::Skipped => Err(Error::TransportUnreachable(
                "refresh already in flight".to_string(),
            )),
            RefreshOutcome::Cancelled => Err(Error::TransportUnreachable(
                "coordinator shut down".to_string(),
            )),
        }
    }

    /// Start the periodic refresh task.
    ///
    /// The first tick fires one interval from now. The task only holds a weak
    /// reference and stops by itself once the coordinator is dropped.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock();
        if task.is_some() || self.is_shut_down() {
            return;
        }

        let coordinator = Arc::downgrade(self);
        let period = self.update_interval;
        let mut shutdown = self.shutdown.subscribe();
        info!("Starting refresh every {:?}", period);

        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.wait_for(|stopped| *stopped) => break,
                }
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                let outcome = coordinator.refresh().await;
                debug!("Scheduled refresh {}", outcome);
            }
            debug!("Refresh task stopped");
        }));
    }

    /// Stop the refresh task and abandon any in-flight refresh.
    ///
    /// Nothing is published after this returns.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        drop(self.current.write());
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Refresh task ended abnormally: {}", e);
            }
        }
        info!("Coordinator stopped");
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}
