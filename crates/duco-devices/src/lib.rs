//! Duco ventilation box support.
//!
//! Builds on the register abstractions of `duco-core`:
//!
//! - **model / registers**: protocol enumerations and the register catalogue
//! - **discovery**: finds the master unit and the modules attached to it
//! - **coordinator**: batched periodic refresh with snapshot publication
//! - **capability / entities**: sensors, numbers and selects per module kind
//! - **adapters**: Modbus TCP and in-memory transports
//! - **integration**: setup and unload of a complete box

pub mod adapters;
pub mod capability;
pub mod coordinator;
pub mod discovery;
pub mod entities;
pub mod integration;
pub mod model;
pub mod node;
pub mod registers;

pub use adapters::{available_transports, create_transport, FakeTransport, TransportCall};
#[cfg(feature = "tcp")]
pub use adapters::ModbusTcpTransport;
pub use capability::{capabilities, Capability};
pub use coordinator::{Coordinator, RefreshOutcome};
pub use discovery::{discover_topology, MASTER_BASE, PROBE_BASES};
pub use entities::{
    build_entities, DucoEntity, DucoNumber, DucoSelect, DucoSensor, EntityKind, EntityState,
    EntityValue,
};
pub use integration::DucoIntegration;
pub use model::{ModuleKind, VentilationStatus};
pub use node::{DeviceInfo, NodeHandle, MANUFACTURER, MODEL_NAME};
