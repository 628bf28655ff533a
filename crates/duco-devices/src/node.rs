//! Discovered nodes and their device identity.

use serde::{Deserialize, Serialize};

use duco_core::RegisterAddress;

use crate::model::ModuleKind;

/// Device model reported for every node.
pub const MODEL_NAME: &str = "DucoBox Focus";

pub const MANUFACTURER: &str = "Duco";

/// A module found on the bus.
///
/// Handles are plain values created by discovery; entities hold copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeHandle {
    /// First register address of the node's block
    pub base: RegisterAddress,
    pub kind: ModuleKind,
    /// Location number; `None` for the master unit
    pub zone: Option<i32>,
}

/// Identity of the device a node belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    /// Parent device, set for zoned nodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_device: Option<String>,
}

impl NodeHandle {
    pub fn new(base: RegisterAddress, kind: ModuleKind, zone: Option<i32>) -> Self {
        Self { base, kind, zone }
    }

    pub fn is_master(&self) -> bool {
        self.kind == ModuleKind::MasterUnit
    }

    /// Device id of the box itself.
    pub fn box_device_id(slave_id: u8) -> String {
        format!("slave_{}", slave_id)
    }

    pub fn device_id(&self, slave_id: u8) -> String {
        match self.zone {
            Some(zone) => format!("{}_zone{}", Self::box_device_id(slave_id), zone),
            None => Self::box_device_id(slave_id),
        }
    }

    pub fn device_name(&self) -> String {
        match self.zone {
            Some(zone) => format!("Ventilation Zone {}", zone),
            None => MODEL_NAME.to_string(),
        }
    }

    pub fn device_info(&self, slave_id: u8) -> DeviceInfo {
        DeviceInfo {
            id: self.device_id(slave_id),
            name: self.device_name(),
            manufacturer: MANUFACTURER.to_string(),
            model: MODEL_NAME.to_string(),
            via_device: self.zone.map(|_| Self::box_device_id(slave_id)),
        }
    }

    /// Stable id of the entity with `key` on this node.
    pub fn unique_id(&self, key: &str) -> String {
        let id = format!("{}_{}", self.kind, key).to_lowercase();
        match self.zone {
            Some(zone) => format!("{}_zone{}", id, zone),
            None => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_master_identity() {
        let master = NodeHandle::new(10, ModuleKind::MasterUnit, None);
        assert!(master.is_master());
        assert_eq!(master.device_id(1), "slave_1");
        assert_eq!(master.device_name(), "DucoBox Focus");
        assert_eq!(master.unique_id("fan"), "master_unit_fan");
        assert_eq!(master.device_info(1).via_device, None);
    }

    #[test]
    fn test_zoned_identity() {
        let valve = NodeHandle::new(20, ModuleKind::Co2Valve, Some(3));
        assert_eq!(valve.device_id(2), "slave_2_zone3");
        assert_eq!(valve.device_name(), "Ventilation Zone 3");
        assert_eq!(valve.unique_id("temperature"), "co2_valve_temperature_zone3");

        let info = valve.device_info(2);
        assert_eq!(info.via_device.as_deref(), Some("slave_2"));
        assert_eq!(info.manufacturer, "Duco");
    }
}
