//! Address aggregation and batched reads.
//!
//! Consumers declare interest in individual register addresses. On refresh
//! the addresses of each access class are grouped into maximal contiguous
//! runs and each run is fetched with a single transport call:
//!
//! ```text
//! declared input addresses:  10 11 12       20 21 22 23
//! runs:                      [10..=12]      [20..=23]
//! transport calls:           read(10, 3)    read(20, 4)
//! ```
//!
//! Every call has a fixed round-trip cost on the bus, so fewer, wider reads
//! win even when a run spans a few addresses nobody asked for.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::register::{AccessClass, RawValue, RegisterAddress};
use crate::snapshot::RegisterSnapshot;
use crate::transport::RegisterTransport;

/// A maximal block of consecutive addresses of one class, read in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ContiguousRun {
    class: AccessClass,
    start: RegisterAddress,
    /// Never zero
    len: u16,
}

impl ContiguousRun {
    /// Run of `count` addresses from `start`, or `None` when it would be
    /// empty or run past the last address.
    pub fn new(class: AccessClass, start: RegisterAddress, count: u16) -> Option<Self> {
        if count == 0 {
            return None;
        }
        start.checked_add(count - 1)?;
        Some(Self {
            class,
            start,
            len: count,
        })
    }

    fn single(class: AccessClass, address: RegisterAddress) -> Self {
        Self {
            class,
            start: address,
            len: 1,
        }
    }

    pub fn class(&self) -> AccessClass {
        self.class
    }

    pub fn start(&self) -> RegisterAddress {
        self.start
    }

    /// Number of addresses, at least one.
    pub fn count(&self) -> u16 {
        self.len
    }

    /// Last address of the run (inclusive).
    pub fn end(&self) -> RegisterAddress {
        self.start + (self.len - 1)
    }

    /// Addresses covered by the run, ascending.
    pub fn addresses(&self) -> impl Iterator<Item = RegisterAddress> {
        let start = self.start;
        (0..self.len).map(move |i| start + i)
    }

    pub fn contains(&self, address: RegisterAddress) -> bool {
        address >= self.start && address <= self.end()
    }

    /// Whether `address` extends this run by exactly one.
    fn is_followed_by(&self, address: RegisterAddress) -> bool {
        self.len < u16::MAX && self.end().checked_add(1) == Some(address)
    }
}

/// Group addresses into maximal contiguous runs.
///
/// The input does not need to be sorted; duplicates collapse into the same
/// run. A new run starts whenever the next address is greater than the
/// previous one plus one.
pub fn group_contiguous<I>(class: AccessClass, addresses: I) -> Vec<ContiguousRun>
where
    I: IntoIterator<Item = RegisterAddress>,
{
    let mut sorted: Vec<RegisterAddress> = addresses.into_iter().collect();
    sorted.sort_unstable();

    let mut runs: Vec<ContiguousRun> = Vec::new();
    for address in sorted {
        match runs.last_mut() {
            Some(run) if run.end() == address => {}
            Some(run) if run.is_followed_by(address) => run.len += 1,
            _ => runs.push(ContiguousRun::single(class, address)),
        }
    }
    runs
}

/// Per-class set of addresses that consumers want refreshed.
///
/// The set only grows during a session; re-declaring an address is a no-op.
#[derive(Debug, Clone, Default)]
pub struct AddressRegistry {
    input: BTreeSet<RegisterAddress>,
    holding: BTreeSet<RegisterAddress>,
}

impl AddressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn addresses_mut(&mut self, class: AccessClass) -> &mut BTreeSet<RegisterAddress> {
        match class {
            AccessClass::Input => &mut self.input,
            AccessClass::Holding => &mut self.holding,
        }
    }

    fn addresses_of(&self, class: AccessClass) -> &BTreeSet<RegisterAddress> {
        match class {
            AccessClass::Input => &self.input,
            AccessClass::Holding => &self.holding,
        }
    }

    /// Add an address to the registry.
    ///
    /// Returns `true` if the address was not registered yet.
    pub fn declare_interest(&mut self, address: RegisterAddress, class: AccessClass) -> bool {
        self.addresses_mut(class).insert(address)
    }

    /// Number of registered addresses of `class`.
    pub fn len(&self, class: AccessClass) -> usize {
        self.addresses_of(class).len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty() && self.holding.is_empty()
    }

    pub fn contains(&self, address: RegisterAddress, class: AccessClass) -> bool {
        self.addresses_of(class).contains(&address)
    }

    /// Registered addresses of `class`, ascending.
    pub fn addresses(&self, class: AccessClass) -> impl Iterator<Item = RegisterAddress> + '_ {
        self.addresses_of(class).iter().copied()
    }

    /// Contiguous runs for `class`.
    pub fn contiguous_runs(&self, class: AccessClass) -> Vec<ContiguousRun> {
        group_contiguous(class, self.addresses(class))
    }

    /// Runs of every class, in the order they are read.
    pub fn plan(&self) -> RefreshPlan {
        let runs = AccessClass::ALL
            .iter()
            .flat_map(|class| self.contiguous_runs(*class))
            .collect();
        RefreshPlan { runs }
    }

    /// Read all registered addresses in as few transport calls as possible.
    pub async fn refresh_all(&self, transport: &dyn RegisterTransport) -> Result<RegisterSnapshot> {
        self.plan().execute(transport).await
    }
}

/// The runs one refresh cycle will read.
///
/// A plan is computed from the registry and owns its runs, so it can be
/// executed without holding any lock on the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshPlan {
    runs: Vec<ContiguousRun>,
}

impl RefreshPlan {
    pub fn runs(&self) -> &[ContiguousRun] {
        &self.runs
    }

    /// Number of transport calls the plan issues.
    pub fn call_count(&self) -> usize {
        self.runs.len()
    }

    /// Execute every run and assemble a new snapshot.
    ///
    /// A run that misses leaves its addresses absent and does not stop the
    /// other runs. An unreachable transport aborts the cycle: no snapshot is
    /// produced.
    pub async fn execute(&self, transport: &dyn RegisterTransport) -> Result<RegisterSnapshot> {
        let mut input = BTreeMap::new();
        let mut holding = BTreeMap::new();
        let mut missed_runs = Vec::new();

        for run in &self.runs {
            match transport.read_registers(run.start, run.len, run.class).await {
                Ok(values) if !values.is_empty() => {
                    if values.len() < run.len as usize {
                        debug!(
                            "short read on {}: {} of {} registers from {}",
                            transport.name(),
                            values.len(),
                            run.len,
                            run.start
                        );
                    }
                    let target = match run.class {
                        AccessClass::Input => &mut input,
                        AccessClass::Holding => &mut holding,
                    };
                    store_run(target, run, &values);
                }
                Ok(_) => {
                    warn!(
                        "{}",
                        miss(run, "empty response".to_string())
                    );
                    missed_runs.push(*run);
                }
                Err(e) if e.is_unreachable() => {
                    warn!("Refresh aborted, {} unreachable: {}", transport.name(), e);
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("{}", miss(run, e.to_string()));
                    missed_runs.push(*run);
                }
            }
        }

        Ok(RegisterSnapshot::with_misses(input, holding, missed_runs))
    }
}

/// Map values positionally onto the run's addresses.
fn store_run(
    target: &mut BTreeMap<RegisterAddress, RawValue>,
    run: &ContiguousRun,
    values: &[RawValue],
) {
    for (address, value) in run.addresses().zip(values.iter().copied()) {
        debug!("read register {}[{}]={}", run.class, address, value);
        target.insert(address, value);
    }
}

fn miss(run: &ContiguousRun, reason: String) -> Error {
    Error::PartialReadMiss {
        class: run.class,
        start: run.start,
        count: run.len,
        reason,
    }
}
