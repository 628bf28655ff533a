//! Point-in-time register snapshot.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::aggregator::ContiguousRun;
use crate::register::{AccessClass, RawValue, RegisterAddress};

/// Immutable mapping from (class, address) to the last raw value read.
///
/// An address is absent when the batched read covering it failed. A
/// snapshot is never mutated after construction; each refresh produces a
/// new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterSnapshot {
    input: BTreeMap<RegisterAddress, RawValue>,
    holding: BTreeMap<RegisterAddress, RawValue>,
    missed_runs: Vec<ContiguousRun>,
    /// Unix timestamp (milliseconds) when the snapshot was assembled
    taken_at: i64,
}

impl RegisterSnapshot {
    /// Create a snapshot from per-class values.
    pub fn new(
        input: BTreeMap<RegisterAddress, RawValue>,
        holding: BTreeMap<RegisterAddress, RawValue>,
    ) -> Self {
        Self::with_misses(input, holding, Vec::new())
    }

    /// Create a snapshot that also records which runs failed to read.
    pub fn with_misses(
        input: BTreeMap<RegisterAddress, RawValue>,
        holding: BTreeMap<RegisterAddress, RawValue>,
        missed_runs: Vec<ContiguousRun>,
    ) -> Self {
        Self {
            input,
            holding,
            missed_runs,
            taken_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    fn values(&self, class: AccessClass) -> &BTreeMap<RegisterAddress, RawValue> {
        match class {
            AccessClass::Input => &self.input,
            AccessClass::Holding => &self.holding,
        }
    }

    /// Raw value at `address`, if the last read of it succeeded.
    pub fn get(&self, class: AccessClass, address: RegisterAddress) -> Option<RawValue> {
        self.values(class).get(&address).copied()
    }

    pub fn contains(&self, class: AccessClass, address: RegisterAddress) -> bool {
        self.values(class).contains_key(&address)
    }

    /// Number of values present for `class`.
    pub fn len(&self, class: AccessClass) -> usize {
        self.values(class).len()
    }

    /// Total number of values present across both classes.
    pub fn total_len(&self) -> usize {
        self.input.len() + self.holding.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0
    }

    /// Present values of `class`, in ascending address order.
    pub fn iter(&self, class: AccessClass) -> impl Iterator<Item = (RegisterAddress, RawValue)> + '_ {
        self.values(class).iter().map(|(a, v)| (*a, *v))
    }

    /// Runs whose read failed during the refresh that produced this snapshot.
    pub fn missed_runs(&self) -> &[ContiguousRun] {
        &self.missed_runs
    }

    pub fn taken_at(&self) -> i64 {
        self.taken_at
    }
}
