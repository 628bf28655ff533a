//! Duco protocol model.
//!
//! Fixed protocol values of the Duco ventilation box, kept as immutable
//! tables keyed by the raw register value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use duco_core::{Error, RawValue};

/// Kind of module found at a node base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleKind {
    MasterUnit,
    Co2Valve,
    HumidityValve,
    Switch,
}

/// Raw module-kind register values.
static MODULE_KINDS: [(RawValue, ModuleKind); 4] = [
    (10, ModuleKind::MasterUnit),
    (12, ModuleKind::Co2Valve),
    (13, ModuleKind::HumidityValve),
    (14, ModuleKind::Switch),
];

impl ModuleKind {
    /// Look up a raw register value. Unknown values are `None`.
    pub fn from_raw(raw: RawValue) -> Option<Self> {
        MODULE_KINDS
            .iter()
            .find(|(code, _)| *code == raw)
            .map(|(_, kind)| *kind)
    }

    pub fn raw(&self) -> RawValue {
        MODULE_KINDS
            .iter()
            .find(|(_, kind)| kind == self)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MasterUnit => "MASTER_UNIT",
            Self::Co2Valve => "CO2_VALVE",
            Self::HumidityValve => "HUMIDITY_VALVE",
            Self::Switch => "SWITCH",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ventilation status reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VentilationStatus {
    Auto,
    #[serde(rename = "HIGH_TEMP_10M")]
    HighTemp10m,
    #[serde(rename = "HIGH_TEMP_20M")]
    HighTemp20m,
    #[serde(rename = "HIGH_TEMP_30M")]
    HighTemp30m,
    ManLow,
    ManMid,
    ManHigh,
    Away,
    TempLow,
    TempMid,
    TempHigh,
    Error,
}

/// Raw status register values.
static STATUS_CODES: [(RawValue, VentilationStatus); 12] = [
    (0, VentilationStatus::Auto),
    (1, VentilationStatus::HighTemp10m),
    (2, VentilationStatus::HighTemp20m),
    (3, VentilationStatus::HighTemp30m),
    (4, VentilationStatus::ManLow),
    (5, VentilationStatus::ManMid),
    (6, VentilationStatus::ManHigh),
    (7, VentilationStatus::Away),
    (8, VentilationStatus::TempLow),
    (9, VentilationStatus::TempMid),
    (10, VentilationStatus::TempHigh),
    (99, VentilationStatus::Error),
];

/// Command values accepted by the ventilation action register.
///
/// The command encoding differs from the reported status encoding.
static WRITE_COMMANDS: [(VentilationStatus, RawValue); 5] = [
    (VentilationStatus::Auto, 5),
    (VentilationStatus::Away, 6),
    (VentilationStatus::ManLow, 2),
    (VentilationStatus::ManMid, 3),
    (VentilationStatus::ManHigh, 4),
];

impl VentilationStatus {
    /// All statuses, in raw-code order.
    pub const ALL: [VentilationStatus; 12] = [
        Self::Auto,
        Self::HighTemp10m,
        Self::HighTemp20m,
        Self::HighTemp30m,
        Self::ManLow,
        Self::ManMid,
        Self::ManHigh,
        Self::Away,
        Self::TempLow,
        Self::TempMid,
        Self::TempHigh,
        Self::Error,
    ];

    pub fn from_raw(raw: RawValue) -> Option<Self> {
        STATUS_CODES
            .iter()
            .find(|(code, _)| *code == raw)
            .map(|(_, status)| *status)
    }

    pub fn raw(&self) -> RawValue {
        STATUS_CODES
            .iter()
            .find(|(_, status)| status == self)
            .map(|(code, _)| *code)
            .unwrap_or_default()
    }

    /// Raw command that requests this status, if it can be requested at all.
    pub fn write_command(&self) -> Option<RawValue> {
        WRITE_COMMANDS
            .iter()
            .find(|(status, _)| status == self)
            .map(|(_, command)| *command)
    }

    pub fn is_writable(&self) -> bool {
        self.write_command().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "AUTO",
            Self::HighTemp10m => "HIGH_TEMP_10M",
            Self::HighTemp20m => "HIGH_TEMP_20M",
            Self::HighTemp30m => "HIGH_TEMP_30M",
            Self::ManLow => "MAN_LOW",
            Self::ManMid => "MAN_MID",
            Self::ManHigh => "MAN_HIGH",
            Self::Away => "AWAY",
            Self::TempLow => "TEMP_LOW",
            Self::TempMid => "TEMP_MID",
            Self::TempHigh => "TEMP_HIGH",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for VentilationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VentilationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| Error::InvalidValue(format!("unknown ventilation status '{}'", s)))
    }
}
