//! Entity descriptions per module kind.
//!
//! A static table maps every [`ModuleKind`] to the entities it exposes.
//! Entities are built from this table after discovery.

use duco_core::TypedRegister;

use crate::model::{ModuleKind, VentilationStatus};
use crate::registers;

/// Register a sensor displays, with its decoded value type.
#[derive(Debug, Clone, Copy)]
pub enum SensorSource {
    Float(&'static TypedRegister<f64>),
    Integer(&'static TypedRegister<i32>),
}

/// Read-only value.
#[derive(Debug)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub source: SensorSource,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
    pub icon: Option<&'static str>,
}

/// Settable numeric value backed by one holding register.
#[derive(Debug)]
pub struct NumberDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub register: &'static TypedRegister<i32>,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: Option<&'static str>,
    pub device_class: Option<&'static str>,
}

impl NumberDescription {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Choice among ventilation statuses.
#[derive(Debug)]
pub struct SelectDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub options: &'static [VentilationStatus],
}

/// One entry of the capability table.
#[derive(Debug, Clone, Copy)]
pub enum Capability {
    Sensor {
        description: &'static SensorDescription,
        /// Replaces the description's name
        name: Option<&'static str>,
    },
    Number(&'static NumberDescription),
    Select(&'static SelectDescription),
}

impl Capability {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Sensor { description, .. } => description.key,
            Self::Number(description) => description.key,
            Self::Select(description) => description.key,
        }
    }
}

const CELSIUS: &str = "°C";
const PERCENTAGE: &str = "%";
const PPM: &str = "ppm";
const CUBIC_METERS_PER_HOUR: &str = "m³/h";

pub static TEMPERATURE: SensorDescription = SensorDescription {
    key: "temperature",
    name: "Temperature",
    source: SensorSource::Float(&registers::TEMPERATURE),
    unit: Some(CELSIUS),
    device_class: Some("temperature"),
    icon: None,
};

pub static CO2: SensorDescription = SensorDescription {
    key: "co2",
    name: "CO2",
    source: SensorSource::Integer(&registers::CO2),
    unit: Some(PPM),
    device_class: Some("co2"),
    icon: None,
};

pub static HUMIDITY: SensorDescription = SensorDescription {
    key: "humidity",
    name: "Humidity",
    source: SensorSource::Float(&registers::HUMIDITY),
    unit: Some(PERCENTAGE),
    device_class: Some("humidity"),
    icon: None,
};

pub static FAN: SensorDescription = SensorDescription {
    key: "fan",
    name: "Fan",
    source: SensorSource::Integer(&registers::VENTILATION_PERCENTAGE),
    unit: Some(PERCENTAGE),
    device_class: None,
    icon: Some("mdi:fan"),
};

pub static VALVE: SensorDescription = SensorDescription {
    key: "valve",
    name: "Valve Position",
    source: SensorSource::Integer(&registers::VENTILATION_PERCENTAGE),
    unit: Some(PERCENTAGE),
    device_class: None,
    icon: Some("mdi:valve"),
};

/// Lower bound of the automatic ventilation range.
pub static AUTO_MIN: SensorDescription = SensorDescription {
    key: "auto_min",
    name: "Auto min",
    source: SensorSource::Integer(&registers::AUTO_MIN),
    unit: Some(PERCENTAGE),
    device_class: None,
    icon: None,
};

pub static AUTO_MAX: SensorDescription = SensorDescription {
    key: "auto_max",
    name: "Auto max",
    source: SensorSource::Integer(&registers::AUTO_MAX),
    unit: Some(PERCENTAGE),
    device_class: None,
    icon: None,
};

pub static VALVE_FLOW: NumberDescription = NumberDescription {
    key: "valve_flow",
    name: "Valve Flow",
    register: &registers::VALVE_FLOW,
    min: 20.0,
    max: 200.0,
    step: 5.0,
    unit: Some(CUBIC_METERS_PER_HOUR),
    device_class: None,
};

pub static VENTILATION_TARGET: NumberDescription = NumberDescription {
    key: "ventilation_target",
    name: "Ventilation Target",
    register: &registers::TARGET_VENTILATION_PERCENTAGE,
    min: -1.0,
    max: 100.0,
    step: 5.0,
    unit: Some(PERCENTAGE),
    device_class: None,
};

pub static CO2_TARGET: NumberDescription = NumberDescription {
    key: "co2_target",
    name: "CO2 Target",
    register: &registers::CO2_TARGET,
    min: 0.0,
    max: 2000.0,
    step: 10.0,
    unit: Some(PPM),
    device_class: Some("co2"),
};

pub static HUMIDITY_TARGET: NumberDescription = NumberDescription {
    key: "humidity_target",
    name: "Humidity Target",
    register: &registers::HUMIDITY_TARGET,
    min: 0.0,
    max: 100.0,
    step: 5.0,
    unit: Some(PERCENTAGE),
    device_class: Some("humidity"),
};

pub static VENTILATION_STATUS: SelectDescription = SelectDescription {
    key: "status",
    name: "Ventilation status",
    options: &VentilationStatus::ALL,
};

static MASTER_UNIT: [Capability; 5] = [
    Capability::Sensor {
        description: &FAN,
        name: None,
    },
    Capability::Sensor {
        description: &AUTO_MIN,
        name: None,
    },
    Capability::Sensor {
        description: &AUTO_MAX,
        name: None,
    },
    Capability::Number(&VENTILATION_TARGET),
    Capability::Select(&VENTILATION_STATUS),
];

static CO2_VALVE: [Capability; 7] = [
    Capability::Sensor {
        description: &TEMPERATURE,
        name: None,
    },
    Capability::Sensor {
        description: &CO2,
        name: None,
    },
    Capability::Sensor {
        description: &VALVE,
        name: None,
    },
    Capability::Number(&CO2_TARGET),
    Capability::Number(&VALVE_FLOW),
    Capability::Number(&VENTILATION_TARGET),
    Capability::Select(&VENTILATION_STATUS),
];

static HUMIDITY_VALVE: [Capability; 7] = [
    Capability::Sensor {
        description: &TEMPERATURE,
        name: None,
    },
    Capability::Sensor {
        description: &HUMIDITY,
        name: None,
    },
    Capability::Sensor {
        description: &VALVE,
        name: None,
    },
    Capability::Number(&HUMIDITY_TARGET),
    Capability::Number(&VALVE_FLOW),
    Capability::Number(&VENTILATION_TARGET),
    Capability::Select(&VENTILATION_STATUS),
];

static SWITCH: [Capability; 1] = [Capability::Sensor {
    description: &TEMPERATURE,
    name: Some("Switch temperature"),
}];

/// Entities exposed by a module of `kind`, in creation order.
pub fn capabilities(kind: ModuleKind) -> &'static [Capability] {
    match kind {
        ModuleKind::MasterUnit => &MASTER_UNIT,
        ModuleKind::Co2Valve => &CO2_VALVE,
        ModuleKind::HumidityValve => &HUMIDITY_VALVE,
        ModuleKind::Switch => &SWITCH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(kind: ModuleKind) -> Vec<&'static str> {
        capabilities(kind).iter().map(Capability::key).collect()
    }

    #[test]
    fn test_capability_table() {
        assert_eq!(
            keys(ModuleKind::MasterUnit),
            vec!["fan", "auto_min", "auto_max", "ventilation_target", "status"]
        );
        assert_eq!(
            keys(ModuleKind::Co2Valve),
            vec![
                "temperature",
                "co2",
                "valve",
                "co2_target",
                "valve_flow",
                "ventilation_target",
                "status"
            ]
        );
        assert_eq!(
            keys(ModuleKind::HumidityValve),
            vec![
                "temperature",
                "humidity",
                "valve",
                "humidity_target",
                "valve_flow",
                "ventilation_target",
                "status"
            ]
        );
        assert_eq!(keys(ModuleKind::Switch), vec!["temperature"]);
    }

    #[test]
    fn test_switch_temperature_name_override() {
        match capabilities(ModuleKind::Switch)[0] {
            Capability::Sensor { name, description } => {
                assert_eq!(name, Some("Switch temperature"));
                assert_eq!(description.name, "Temperature");
            }
            other => panic!("unexpected capability {:?}", other),
        }
    }

    #[test]
    fn test_number_ranges() {
        assert!(VALVE_FLOW.contains(20.0));
        assert!(VALVE_FLOW.contains(200.0));
        assert!(!VALVE_FLOW.contains(15.0));
        assert!(VENTILATION_TARGET.contains(-1.0));
        assert!(!VENTILATION_TARGET.contains(-2.0));
        assert!(!CO2_TARGET.contains(2001.0));
        assert!(!HUMIDITY_TARGET.contains(f64::NAN));
    }
}
