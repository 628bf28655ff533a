//! Batched refresh tests for AddressRegistry.
//!
//! Tests include:
//! - One transport call per contiguous run
//! - Per-run failures leave addresses absent
//! - Short reads are mapped positionally
//! - An unreachable transport aborts the cycle

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use duco_core::{
    AccessClass, AddressRegistry, Error, RawValue, RegisterAddress, RegisterTransport,
    TransportError, TransportResult, TypedRegister,
};

/// Serves fixed tables; a read misses when any address of the range is absent.
#[derive(Default)]
struct TableTransport {
    input: BTreeMap<RegisterAddress, RawValue>,
    holding: BTreeMap<RegisterAddress, RawValue>,
    unreachable: bool,
    short_reads: bool,
    calls: Mutex<Vec<(AccessClass, RegisterAddress, u16)>>,
    writes: Mutex<Vec<(RegisterAddress, RawValue)>>,
}

impl TableTransport {
    fn calls(&self) -> Vec<(AccessClass, RegisterAddress, u16)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RegisterTransport for TableTransport {
    fn name(&self) -> &str {
        "table"
    }

    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>> {
        self.calls.lock().unwrap().push((class, address, count));
        if self.unreachable {
            return Err(TransportError::Unreachable("connection refused".to_string()));
        }
        let table = match class {
            AccessClass::Input => &self.input,
            AccessClass::Holding => &self.holding,
        };
        let mut values = Vec::new();
        for offset in 0..count {
            let current = address + offset;
            match table.get(&current) {
                Some(value) => values.push(*value),
                None if self.short_reads && !values.is_empty() => break,
                None => {
                    return Err(TransportError::Miss {
                        class,
                        address: current,
                    })
                }
            }
        }
        Ok(values)
    }

    async fn write_register(
        &self,
        address: RegisterAddress,
        value: RawValue,
    ) -> TransportResult<()> {
        if self.unreachable {
            return Err(TransportError::Unreachable("connection refused".to_string()));
        }
        self.writes.lock().unwrap().push((address, value));
        Ok(())
    }
}

fn registry_with(class: AccessClass, addresses: &[RegisterAddress]) -> AddressRegistry {
    let mut registry = AddressRegistry::new();
    for address in addresses {
        registry.declare_interest(*address, class);
    }
    registry
}

#[tokio::test]
async fn test_two_runs_two_calls() {
    let transport = TableTransport {
        input: (10..=12).chain(20..=23).map(|a| (a, a * 2)).collect(),
        ..Default::default()
    };
    let registry = registry_with(AccessClass::Input, &[10, 11, 12, 20, 21, 22, 23]);

    let snapshot = registry.refresh_all(&transport).await.unwrap();

    assert_eq!(
        transport.calls(),
        vec![(AccessClass::Input, 10, 3), (AccessClass::Input, 20, 4)]
    );
    assert_eq!(snapshot.get(AccessClass::Input, 12), Some(24));
    assert_eq!(snapshot.get(AccessClass::Input, 23), Some(46));
    assert!(snapshot.missed_runs().is_empty());
}

#[tokio::test]
async fn test_empty_registry_issues_no_calls() {
    let transport = TableTransport::default();
    let snapshot = AddressRegistry::new().refresh_all(&transport).await.unwrap();
    assert!(transport.calls().is_empty());
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn test_failed_run_does_not_abort_other_runs() {
    let transport = TableTransport {
        input: BTreeMap::from([(10, 10), (11, 0), (12, 69)]),
        holding: BTreeMap::from([(10, 65535)]),
        ..Default::default()
    };
    let mut registry = registry_with(AccessClass::Input, &[10, 11, 12, 20, 21]);
    registry.declare_interest(10, AccessClass::Holding);

    let snapshot = registry.refresh_all(&transport).await.unwrap();

    assert_eq!(transport.calls().len(), 3);
    assert_eq!(snapshot.get(AccessClass::Input, 12), Some(69));
    assert_eq!(snapshot.get(AccessClass::Input, 20), None);
    assert_eq!(snapshot.get(AccessClass::Input, 21), None);
    assert_eq!(snapshot.get(AccessClass::Holding, 10), Some(65535));
    assert_eq!(snapshot.missed_runs().len(), 1);
    assert_eq!(snapshot.missed_runs()[0].start(), 20);
}

#[tokio::test]
async fn test_short_read_maps_prefix() {
    let transport = TableTransport {
        input: (20..=23).map(|a| (a, a)).collect(),
        short_reads: true,
        ..Default::default()
    };
    let registry = registry_with(AccessClass::Input, &[20, 21, 22, 23, 24, 25]);

    let snapshot = registry.refresh_all(&transport).await.unwrap();

    for address in 20..=23 {
        assert_eq!(snapshot.get(AccessClass::Input, address), Some(address));
    }
    assert_eq!(snapshot.get(AccessClass::Input, 24), None);
    assert_eq!(snapshot.get(AccessClass::Input, 25), None);
}

#[tokio::test]
async fn test_unreachable_transport_fails_cycle() {
    let transport = TableTransport {
        unreachable: true,
        ..Default::default()
    };
    let registry = registry_with(AccessClass::Input, &[10, 20]);

    let err = registry.refresh_all(&transport).await.unwrap_err();

    assert!(matches!(err, Error::TransportUnreachable(_)));
    // Aborted after the first call, no retry.
    assert_eq!(transport.calls().len(), 1);
}

fn percent(raw: RawValue) -> i32 {
    if raw == 65535 {
        -1
    } else {
        raw as i32
    }
}

fn percent_raw(value: &i32) -> Option<RawValue> {
    match *value {
        -1 => Some(65535),
        v => RawValue::try_from(v).ok(),
    }
}

static TARGET: TypedRegister<i32> = TypedRegister::holding(0, percent, percent_raw);

#[tokio::test]
async fn test_typed_write_and_direct_read() {
    let transport = TableTransport {
        holding: BTreeMap::from([(20, 65535)]),
        ..Default::default()
    };

    TARGET.write(&transport, 20, &-1).await.unwrap();
    TARGET.write(&transport, 20, &50).await.unwrap();
    assert_eq!(
        *transport.writes.lock().unwrap(),
        vec![(20, 65535), (20, 50)]
    );

    assert_eq!(TARGET.read_direct(&transport, 20).await.unwrap(), Some(-1));
    assert_eq!(TARGET.read_direct(&transport, 30).await.unwrap(), None);
}

#[tokio::test]
async fn test_rejected_value_issues_no_write() {
    let transport = TableTransport::default();
    let err = TARGET.write(&transport, 20, &-7).await.unwrap_err();
    assert!(matches!(err, Error::NotWritable(_)));
    assert!(transport.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_direct_read_unreachable_is_error() {
    let transport = TableTransport {
        unreachable: true,
        ..Default::default()
    };
    let err = TARGET.read_direct(&transport, 10).await.unwrap_err();
    assert!(err.is_not_ready());
}
