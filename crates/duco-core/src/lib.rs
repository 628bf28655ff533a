//! Core traits and types for Duco Link.
//!
//! This crate defines the register-level abstractions shared by the rest of
//! the workspace:
//!
//! - **AccessClass / TypedRegister**: typed view over a raw 16-bit register
//!   at a fixed offset inside a node's address block
//! - **RegisterTransport**: the injected bus client (read N registers, write one)
//! - **AddressRegistry**: collects requested addresses and reads them back in
//!   as few contiguous transactions as possible
//! - **RegisterSnapshot**: immutable result of one batched refresh
//! - **EventBus**: broadcast channel used to notify consumers of new snapshots

pub mod aggregator;
pub mod config;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod register;
pub mod snapshot;
pub mod transport;

pub use aggregator::{group_contiguous, AddressRegistry, ContiguousRun, RefreshPlan};
pub use config::{DucoConfig, ModbusConfig};
pub use error::{Error, Result};
pub use event::{DucoEvent, EventMetadata};
pub use eventbus::{EventBus, EventBusReceiver, FilteredReceiver};
pub use register::{AccessClass, RawValue, RegisterAddress, TypedRegister};
pub use snapshot::RegisterSnapshot;
pub use transport::{RegisterTransport, SharedTransport, TransportError, TransportResult};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::aggregator::{AddressRegistry, ContiguousRun};
    pub use crate::error::{Error, Result};
    pub use crate::event::DucoEvent;
    pub use crate::eventbus::EventBus;
    pub use crate::register::{AccessClass, TypedRegister};
    pub use crate::snapshot::RegisterSnapshot;
    pub use crate::transport::{RegisterTransport, SharedTransport, TransportError};
}
