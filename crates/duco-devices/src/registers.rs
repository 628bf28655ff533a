//! Duco register catalogue.
//!
//! Offsets are relative to a node's base address. Every Duco node uses the
//! same layout, so one set of statics serves all of them.

use duco_core::{RawValue, TypedRegister};

use crate::model::{ModuleKind, VentilationStatus};

/// Raw value meaning "no ventilation override".
pub const NO_OVERRIDE_RAW: RawValue = 65535;

/// Decoded value of [`NO_OVERRIDE_RAW`].
pub const NO_OVERRIDE: i32 = -1;

fn module_kind(raw: RawValue) -> Option<ModuleKind> {
    ModuleKind::from_raw(raw)
}

fn ventilation_status(raw: RawValue) -> Option<VentilationStatus> {
    VentilationStatus::from_raw(raw)
}

fn integer(raw: RawValue) -> i32 {
    i32::from(raw)
}

fn integer_raw(value: &i32) -> Option<RawValue> {
    RawValue::try_from(*value).ok()
}

fn tenths(raw: RawValue) -> f64 {
    f64::from(raw) / 10.0
}

fn hundredths(raw: RawValue) -> f64 {
    f64::from(raw) / 100.0
}

fn percentage_override(raw: RawValue) -> i32 {
    if raw == NO_OVERRIDE_RAW {
        NO_OVERRIDE
    } else {
        i32::from(raw)
    }
}

fn percentage_override_raw(value: &i32) -> Option<RawValue> {
    if *value == NO_OVERRIDE {
        Some(NO_OVERRIDE_RAW)
    } else {
        RawValue::try_from(*value).ok()
    }
}

fn action_command(status: &VentilationStatus) -> Option<RawValue> {
    status.write_command()
}

// Input registers

pub static MODULE_KIND: TypedRegister<Option<ModuleKind>> = TypedRegister::input(0, module_kind);
pub static VENTILATION_STATUS: TypedRegister<Option<VentilationStatus>> =
    TypedRegister::input(1, ventilation_status);
pub static VENTILATION_PERCENTAGE: TypedRegister<i32> = TypedRegister::input(2, integer);
/// Degrees Celsius
pub static TEMPERATURE: TypedRegister<f64> = TypedRegister::input(3, tenths);
/// Parts per million
pub static CO2: TypedRegister<i32> = TypedRegister::input(4, integer);
/// Relative humidity in percent
pub static HUMIDITY: TypedRegister<f64> = TypedRegister::input(5, hundredths);
/// Zone the node is installed in
pub static LOCATION_NUMBER: TypedRegister<i32> = TypedRegister::input(9, integer);

// Holding registers

/// Ventilation override in percent, [`NO_OVERRIDE`] when unset.
pub static TARGET_VENTILATION_PERCENTAGE: TypedRegister<i32> =
    TypedRegister::holding(0, percentage_override, percentage_override_raw);
pub static CO2_TARGET: TypedRegister<i32> = TypedRegister::holding(1, integer, integer_raw);
pub static HUMIDITY_TARGET: TypedRegister<i32> = TypedRegister::holding(2, integer, integer_raw);
/// Cubic metres per hour
pub static VALVE_FLOW: TypedRegister<i32> = TypedRegister::holding(4, integer, integer_raw);
pub static AUTO_MIN: TypedRegister<i32> = TypedRegister::holding(5, integer, integer_raw);
pub static AUTO_MAX: TypedRegister<i32> = TypedRegister::holding(6, integer, integer_raw);

/// Ventilation command. Write-only; the box reports the resulting state
/// through [`VENTILATION_STATUS`].
pub static VENTILATION_ACTION: TypedRegister<VentilationStatus> =
    TypedRegister::write_only(9, action_command);
