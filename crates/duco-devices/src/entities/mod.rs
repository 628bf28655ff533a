//! Entities exposed to the host.
//!
//! Every entity belongs to one node, reads its value from the coordinator's
//! latest snapshot and declares its registers with the coordinator when it
//! is created.

pub mod number;
pub mod select;
pub mod sensor;

pub use number::DucoNumber;
pub use select::DucoSelect;
pub use sensor::DucoSensor;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::capability::{capabilities, Capability};
use crate::coordinator::Coordinator;
use crate::node::{DeviceInfo, NodeHandle};

/// Decoded entity value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityValue {
    Float(f64),
    Integer(i64),
    Option(&'static str),
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Option(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    Number,
    Select,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Number => "number",
            Self::Select => "select",
        }
    }
}

/// Point-in-time view of an entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState {
    pub unique_id: String,
    pub kind: EntityKind,
    pub name: String,
    pub device_id: String,
    /// `None` when the register was absent from the last snapshot
    pub value: Option<EntityValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    /// Whether the last refresh succeeded
    pub available: bool,
}

/// Fields shared by every entity kind.
pub(crate) struct EntityBase {
    pub(crate) coordinator: Arc<Coordinator>,
    pub(crate) node: NodeHandle,
    pub(crate) unique_id: String,
    pub(crate) name: String,
    pub(crate) device: DeviceInfo,
}

impl EntityBase {
    pub(crate) fn new(
        coordinator: &Arc<Coordinator>,
        node: NodeHandle,
        key: &str,
        name: &str,
        slave_id: u8,
    ) -> Self {
        Self {
            coordinator: Arc::clone(coordinator),
            node,
            unique_id: node.unique_id(key),
            name: name.to_string(),
            device: node.device_info(slave_id),
        }
    }

    pub(crate) fn state(
        &self,
        kind: EntityKind,
        value: Option<EntityValue>,
        unit: Option<&'static str>,
    ) -> EntityState {
        EntityState {
            unique_id: self.unique_id.clone(),
            kind,
            name: self.name.clone(),
            device_id: self.device.id.clone(),
            value,
            unit,
            available: self.coordinator.last_update_success(),
        }
    }
}

/// Any entity built from the capability table.
pub enum DucoEntity {
    Sensor(DucoSensor),
    Number(DucoNumber),
    Select(DucoSelect),
}

impl DucoEntity {
    fn base(&self) -> &EntityBase {
        match self {
            Self::Sensor(entity) => &entity.base,
            Self::Number(entity) => &entity.base,
            Self::Select(entity) => &entity.base,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Sensor(_) => EntityKind::Sensor,
            Self::Number(_) => EntityKind::Number,
            Self::Select(_) => EntityKind::Select,
        }
    }

    pub fn unique_id(&self) -> &str {
        &self.base().unique_id
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn node(&self) -> NodeHandle {
        self.base().node
    }

    pub fn device_info(&self) -> &DeviceInfo {
        &self.base().device
    }

    /// Whether the last refresh succeeded.
    pub fn available(&self) -> bool {
        self.base().coordinator.last_update_success()
    }

    pub fn state(&self) -> EntityState {
        match self {
            Self::Sensor(entity) => entity.state(),
            Self::Number(entity) => entity.state(),
            Self::Select(entity) => entity.state(),
        }
    }

    pub fn as_number(&self) -> Option<&DucoNumber> {
        match self {
            Self::Number(entity) => Some(entity),
            _ => None,
        }
    }

    pub fn as_select(&self) -> Option<&DucoSelect> {
        match self {
            Self::Select(entity) => Some(entity),
            _ => None,
        }
    }
}

/// Create the entities of every node and attach them to the coordinator.
pub fn build_entities(
    coordinator: &Arc<Coordinator>,
    nodes: &[NodeHandle],
    slave_id: u8,
) -> Vec<DucoEntity> {
    nodes
        .iter()
        .flat_map(|node| {
            capabilities(node.kind).iter().map(move |capability| match *capability {
                Capability::Sensor { description, name } => DucoEntity::Sensor(DucoSensor::new(
                    coordinator,
                    *node,
                    description,
                    name,
                    slave_id,
                )),
                Capability::Number(description) => DucoEntity::Number(DucoNumber::new(
                    coordinator,
                    *node,
                    description,
                    slave_id,
                )),
                Capability::Select(description) => DucoEntity::Select(DucoSelect::new(
                    coordinator,
                    *node,
                    description,
                    slave_id,
                )),
            })
        })
        .collect()
}
