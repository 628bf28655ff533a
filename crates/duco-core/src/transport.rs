//! Register transport interface.
//!
//! The transport is the bus client that performs the actual wire
//! transaction. It is injected into the refresh machinery so the same code
//! runs against a Modbus TCP gateway or an in-memory fake.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::register::{AccessClass, RawValue, RegisterAddress};

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Error type for a single transport call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// No connection to the bus. Fails the whole refresh cycle.
    #[error("Transport unreachable: {0}")]
    Unreachable(String),

    /// The call did not complete in time
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// The device answered with an exception response
    #[error("Device exception: {0}")]
    Exception(String),

    /// The device has no value for a requested address
    #[error("No value for {class} register {address}")]
    Miss {
        class: AccessClass,
        address: RegisterAddress,
    },
}

impl TransportError {
    /// Whether the bus itself is unavailable, as opposed to one request failing.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }
}

/// Bus client used by the register layer.
#[async_trait]
pub trait RegisterTransport: Send + Sync {
    /// Transport name, used in log output.
    fn name(&self) -> &str;

    /// Read `count` consecutive registers of `class` starting at `address`.
    async fn read_registers(
        &self,
        address: RegisterAddress,
        count: u16,
        class: AccessClass,
    ) -> TransportResult<Vec<RawValue>>;

    /// Write a single holding register.
    async fn write_register(&self, address: RegisterAddress, value: RawValue)
        -> TransportResult<()>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn RegisterTransport>;
