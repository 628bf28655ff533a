//! Settable number entity.

use std::sync::Arc;

use tracing::info;

use duco_core::{Error, Result};

use super::{EntityBase, EntityKind, EntityState, EntityValue};
use crate::capability::NumberDescription;
use crate::coordinator::Coordinator;
use crate::node::NodeHandle;

pub struct DucoNumber {
    pub(crate) base: EntityBase,
    description: &'static NumberDescription,
}

impl DucoNumber {
    pub fn new(
        coordinator: &Arc<Coordinator>,
        node: NodeHandle,
        description: &'static NumberDescription,
        slave_id: u8,
    ) -> Self {
        coordinator.attach(description.register, node.base);
        Self {
            base: EntityBase::new(coordinator, node, description.key, description.name, slave_id),
            description,
        }
    }

    pub fn description(&self) -> &'static NumberDescription {
        self.description
    }

    pub fn value(&self) -> Option<i32> {
        self.base
            .coordinator
            .read(self.description.register, self.base.node.base)
    }

    /// Write a new value.
    ///
    /// Values outside the description's range are rejected with
    /// [`Error::InvalidValue`] before reaching the bus. Fractions are
    /// truncated.
    pub async fn set_value(&self, value: f64) -> Result<()> {
        if !self.description.contains(value) {
            return Err(Error::InvalidValue(format!(
                "{} must be within {}..={}, got {}",
                self.base.unique_id, self.description.min, self.description.max, value
            )));
        }
        let value = value.trunc() as i32;
        info!("Setting {} to {}", self.base.unique_id, value);
        self.base
            .coordinator
            .write(self.description.register, self.base.node.base, &value)
            .await
    }

    pub fn state(&self) -> EntityState {
        self.base.state(
            EntityKind::Number,
            self.value().map(|v| EntityValue::Integer(i64::from(v))),
            self.description.unit,
        )
    }
}
