//! In-memory transport.
//!
//! Serves fixed register tables, by default the ones of a small test box: a
//! master unit at base 10 and a CO2 valve at base 20 in zone 1. Used by the
//! CLI `--fake` mode and throughout the tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use duco_core::{
    AccessClass, RawValue, RegisterAddress, RegisterTransport, TransportError, TransportResult,
};

/// Input registers of the default test box.
pub const DEFAULT_INPUT_REGISTERS: [(RegisterAddress, RawValue); 10] = [
    (10, 10),
    (11, 0),
    (12, 69),
    (20, 12),
    (21, 0),
    (22, 44),
    (23, 201),
    (24, 3003),
    (25, 8001),
    (29, 1),
];

/// Holding registers of the default test box.
pub const DEFAULT_HOLDING_REGISTERS: [(RegisterAddress, RawValue); 1] = [(10, 65535)];

/// A call recorded by [`FakeTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TransportCall {
    Read {
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    },
    Write {
        address: RegisterAddress,
        value: RawValue,
    },
}

/// Table-backed transport.
///
/// A read misses when any address of the requested range is absent, unless
/// partial reads are enabled, in which case the present prefix is returned.
pub struct FakeTransport {
    input: Mutex<BTreeMap<RegisterAddress, RawValue>>,
    holding: Mutex<BTreeMap<RegisterAddress, RawValue>>,
    unreachable: AtomicBool,
    partial_reads: bool,
    calls: Mutex<Vec<TransportCall>>,
}

impl FakeTransport {
    /// Create a transport serving the default test box.
    pub fn new() -> Self {
        Self::with_tables(
            DEFAULT_INPUT_REGISTERS.into_iter().collect(),
            DEFAULT_HOLDING_REGISTERS.into_iter().collect(),
        )
    }

    /// Create a transport with no registers at all.
    pub fn empty() -> Self {
        Self::with_tables(BTreeMap::new(), BTreeMap::new())
    }

    pub fn with_tables(
        input: BTreeMap<RegisterAddress, RawValue>,
        holding: BTreeMap<RegisterAddress, RawValue>,
    ) -> Self {
        Self {
            input: Mutex::new(input),
            holding: Mutex::new(holding),
            unreachable: AtomicBool::new(false),
            partial_reads: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Set an input register.
    pub fn with_input(self, address: RegisterAddress, value: RawValue) -> Self {
        self.input.lock().insert(address, value);
        self
    }

    /// Set a holding register.
    pub fn with_holding(self, address: RegisterAddress, value: RawValue) -> Self {
        self.holding.lock().insert(address, value);
        self
    }

    /// Return the present prefix of a range instead of missing.
    pub fn with_partial_reads(mut self) -> Self {
        self.partial_reads = true;
        self
    }

    /// Make every call fail as if the connection were gone.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn remove_input(&self, address: RegisterAddress) {
        self.input.lock().remove(&address);
    }

    pub fn set_input(&self, address: RegisterAddress, value: RawValue) {
        self.input.lock().insert(address, value);
    }

    pub fn holding_value(&self, address: RegisterAddress) -> Option<RawValue> {
        self.holding.lock().get(&address).copied()
    }

    /// Calls issued so far, oldest first.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn read_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, TransportCall::Read { .. }))
            .count()
    }

    pub fn writes(&self) -> Vec<(RegisterAddress, RawValue)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                TransportCall::Write { address, value } => Some((*address, *value)),
                TransportCall::Read { .. } => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn check_reachable(&self) -> TransportResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(TransportError::Unreachable("fake transport offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegisterTransport for FakeTransport {
    fn name(&self) -> &str {
        "fake"
    }

    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>> {
        self.calls.lock().push(TransportCall::Read {
            address,
            count,
            class,
        });
        self.check_reachable()?;

        let table = match class {
            AccessClass::Input => self.input.lock(),
            AccessClass::Holding => self.holding.lock(),
        };
        let mut values = Vec::with_capacity(count as usize);
        for current in (0..count).map(|offset| address.wrapping_add(offset)) {
            match table.get(&current) {
                Some(value) => values.push(*value),
                None if self.partial_reads && !values.is_empty() => break,
                None => {
                    debug!("fake {} register {} missing", class, current);
                    return Err(TransportError::Miss {
                        class,
                        address: current,
                    });
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
        self.calls
            .lock()
            .push(TransportCall::Write { address, value });
        self.check_reachable()?;
        self.holding.lock().insert(address, value);
        Ok(())
    }
}
