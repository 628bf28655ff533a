//! Coordinator refresh cycle tests.
//!
//! Tests include:
//! - Published snapshots with per-run misses
//! - Failed cycles keep the previous snapshot
//! - Overlapping refreshes are skipped
//! - Shutdown abandons an in-flight refresh, even one whose reads completed
//! - The periodic timer publishes on its own

use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use duco_core::{
    AccessClass, DucoEvent, RawValue, RegisterAddress, RegisterTransport, TransportError,
    TransportResult,
};
use duco_devices::registers::{TARGET_VENTILATION_PERCENTAGE, TEMPERATURE, VENTILATION_PERCENTAGE};
use duco_devices::{Coordinator, FakeTransport, RefreshOutcome};

/// Holds every read until a permit is released.
struct GatedTransport {
    inner: FakeTransport,
    gate: Semaphore,
}

impl GatedTransport {
    fn new() -> Self {
        Self {
            inner: FakeTransport::new(),
            gate: Semaphore::new(0),
        }
    }

    fn open(&self) {
        self.gate.add_permits(16);
    }
}

#[async_trait]
impl RegisterTransport for GatedTransport {
    fn name(&self) -> &str {
        "gated"
    }

    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>> {
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| TransportError::Unreachable("gate closed".to_string()))?;
        self.inner.read_registers(address, count, class).await
    }

    async fn write_register(
        &self,
        address: RegisterAddress,
        value: RawValue,
    ) -> TransportResult<()> {
        self.inner.write_register(address, value).await
    }
}

/// Shuts its coordinator down from inside the read, then answers normally.
struct ShutdownOnReadTransport {
    inner: FakeTransport,
    coordinator: OnceLock<Weak<Coordinator>>,
}

#[async_trait]
impl RegisterTransport for ShutdownOnReadTransport {
    fn name(&self) -> &str {
        "shutdown-on-read"
    }

    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>> {
        if let Some(coordinator) = self.coordinator.get().and_then(Weak::upgrade) {
            coordinator.shutdown().await;
        }
        self.inner.read_registers(address, count, class).await
    }

    async fn write_register(
        &self,
        address: RegisterAddress,
        value: RawValue,
    ) -> TransportResult<()> {
        self.inner.write_register(address, value).await
    }
}

fn attach_defaults(coordinator: &Coordinator) {
    coordinator.attach(&VENTILATION_PERCENTAGE, 10);
    coordinator.attach(&TEMPERATURE, 20);
    coordinator.attach(&TARGET_VENTILATION_PERCENTAGE, 10);
}

async fn wait_until_refreshing(coordinator: &Coordinator) {
    while !coordinator.is_refreshing() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_refresh_publishes_snapshot_with_misses() {
    let fake = Arc::new(FakeTransport::new());
    let coordinator = Coordinator::new(fake.clone(), Duration::from_secs(15));
    attach_defaults(&coordinator);
    // Absent on the default box
    coordinator.attach(&TARGET_VENTILATION_PERCENTAGE, 20);
    let mut events = coordinator.subscribe();

    let outcome = coordinator.refresh().await;

    // Input 12 and 23 form separate runs; holding 10 and 20 as well.
    assert_eq!(
        outcome,
        RefreshOutcome::Published {
            values: 3,
            missed_runs: 1
        }
    );
    assert_eq!(fake.read_count(), 4);
    assert_eq!(coordinator.read(&VENTILATION_PERCENTAGE, 10), Some(69));
    assert_eq!(coordinator.read(&TEMPERATURE, 20), Some(20.1));
    assert_eq!(coordinator.read(&TARGET_VENTILATION_PERCENTAGE, 10), Some(-1));
    assert_eq!(coordinator.read(&TARGET_VENTILATION_PERCENTAGE, 20), None);
    assert!(coordinator.last_update_success());

    let (event, meta) = events.try_recv().unwrap();
    assert!(matches!(
        event,
        DucoEvent::SnapshotPublished {
            values: 3,
            missed_runs: 1,
            ..
        }
    ));
    assert_eq!(meta.source, "duco.coordinator");
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let fake = Arc::new(FakeTransport::new());
    let coordinator = Coordinator::new(fake.clone(), Duration::from_secs(15));
    attach_defaults(&coordinator);

    assert!(coordinator.refresh().await.is_published());
    let before = coordinator.snapshot().unwrap();
    let mut events = coordinator.subscribe();

    fake.set_unreachable(true);
    let outcome = coordinator.refresh().await;

    assert!(matches!(outcome, RefreshOutcome::Failed { .. }));
    assert!(!coordinator.last_update_success());
    let after = coordinator.snapshot().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(coordinator.read(&TEMPERATURE, 20), Some(20.1));
    let (event, _) = events.try_recv().unwrap();
    assert!(matches!(event, DucoEvent::RefreshFailed { .. }));

    // Retried on the next cycle
    fake.set_unreachable(false);
    fake.set_input(23, 215);
    assert!(coordinator.refresh().await.is_published());
    assert!(coordinator.last_update_success());
    assert_eq!(coordinator.read(&TEMPERATURE, 20), Some(21.5));
}

#[tokio::test]
async fn test_first_refresh_fails_when_unreachable() {
    let fake = Arc::new(FakeTransport::new());
    fake.set_unreachable(true);
    let coordinator = Coordinator::new(fake.clone(), Duration::from_secs(15));
    attach_defaults(&coordinator);

    let err = coordinator.first_refresh().await.unwrap_err();
    assert!(err.is_not_ready());
    assert!(coordinator.snapshot().is_none());
    // No retry within the cycle
    assert_eq!(fake.read_count(), 1);
}

#[tokio::test]
async fn test_overlapping_refresh_is_skipped() {
    let transport = Arc::new(GatedTransport::new());
    let coordinator = Arc::new(Coordinator::new(transport.clone(), Duration::from_secs(15)));
    coordinator.attach(&TEMPERATURE, 20);

    let in_flight = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh().await })
    };
    wait_until_refreshing(&coordinator).await;

    assert_eq!(coordinator.refresh().await, RefreshOutcome::Skipped);

    transport.open();
    let outcome = in_flight.await.unwrap();
    assert_eq!(
        outcome,
        RefreshOutcome::Published {
            values: 1,
            missed_runs: 0
        }
    );
    assert!(!coordinator.is_refreshing());
}

#[tokio::test]
async fn test_shutdown_abandons_in_flight_refresh() {
    let transport = Arc::new(GatedTransport::new());
    let coordinator = Arc::new(Coordinator::new(transport.clone(), Duration::from_secs(15)));
    coordinator.attach(&TEMPERATURE, 20);
    let mut events = coordinator.subscribe();

    let in_flight = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.refresh().await })
    };
    wait_until_refreshing(&coordinator).await;

    coordinator.shutdown().await;
    transport.open();

    assert_eq!(in_flight.await.unwrap(), RefreshOutcome::Cancelled);
    assert!(coordinator.snapshot().is_none());
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_shutdown_during_last_read_publishes_nothing() {
    let transport = Arc::new(ShutdownOnReadTransport {
        inner: FakeTransport::new(),
        coordinator: OnceLock::new(),
    });
    let coordinator = Arc::new(Coordinator::new(transport.clone(), Duration::from_secs(15)));
    transport
        .coordinator
        .set(Arc::downgrade(&coordinator))
        .unwrap();
    coordinator.attach(&TEMPERATURE, 20);
    let mut events = coordinator.subscribe();

    assert_eq!(coordinator.refresh().await, RefreshOutcome::Cancelled);
    assert!(coordinator.snapshot().is_none());
    assert!(!coordinator.last_update_success());
    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn test_timer_refreshes_periodically() {
    let fake = Arc::new(FakeTransport::new());
    let coordinator = Arc::new(Coordinator::new(fake.clone(), Duration::from_millis(20)));
    coordinator.attach(&TEMPERATURE, 20);
    let mut events = coordinator.event_bus().refresh_events();

    coordinator.start();
    assert!(coordinator.is_running());

    for _ in 0..2 {
        let received = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timer did not fire");
        assert!(matches!(
            received,
            Some((DucoEvent::SnapshotPublished { .. }, _))
        ));
    }

    coordinator.shutdown().await;
    assert!(!coordinator.is_running());
    let reads = fake.read_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(fake.read_count(), reads);
}
