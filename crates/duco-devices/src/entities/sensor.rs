//! Read-only sensor entity.

use std::sync::Arc;

use super::{EntityBase, EntityKind, EntityState, EntityValue};
use crate::capability::{SensorDescription, SensorSource};
use crate::coordinator::Coordinator;
use crate::node::NodeHandle;

pub struct DucoSensor {
    pub(crate) base: EntityBase,
    description: &'static SensorDescription,
}

impl DucoSensor {
    pub fn new(
        coordinator: &Arc<Coordinator>,
        node: NodeHandle,
        description: &'static SensorDescription,
        name_override: Option<&'static str>,
        slave_id: u8,
    ) -> Self {
        match description.source {
            SensorSource::Float(register) => coordinator.attach(register, node.base),
            SensorSource::Integer(register) => coordinator.attach(register, node.base),
        }
        let name = name_override.unwrap_or(description.name);
        Self {
            base: EntityBase::new(coordinator, node, description.key, name, slave_id),
            description,
        }
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    /// Current value from the latest snapshot.
    pub fn value(&self) -> Option<EntityValue> {
        let coordinator = &self.base.coordinator;
        let base = self.base.node.base;
        match self.description.source {
            SensorSource::Float(register) => coordinator.read(register, base).map(EntityValue::Float),
            SensorSource::Integer(register) => coordinator
                .read(register, base)
                .map(|v| EntityValue::Integer(i64::from(v))),
        }
    }

    pub fn state(&self) -> EntityState {
        self.base
            .state(EntityKind::Sensor, self.value(), self.description.unit)
    }
}
