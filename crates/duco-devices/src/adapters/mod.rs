//! Register transports.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `tcp` | Modbus TCP transport via `tokio-modbus` (default) |
//!
//! The in-memory [`FakeTransport`] is always available.

pub mod fake;
pub use fake::{FakeTransport, TransportCall};

#[cfg(feature = "tcp")]
pub mod tcp;
#[cfg(feature = "tcp")]
pub use tcp::ModbusTcpTransport;

use std::sync::Arc;

use tracing::warn;

use duco_core::{DucoConfig, Result, SharedTransport};

/// Create the transport selected by `config`.
///
/// The TCP transport connects lazily; a gateway that is down surfaces on the
/// first request as an unreachable transport.
pub fn create_transport(config: &DucoConfig) -> Result<SharedTransport> {
    if config.fake {
        warn!("****************** Using fake Modbus ******************");
        return Ok(Arc::new(FakeTransport::new()));
    }

    #[cfg(feature = "tcp")]
    {
        Ok(Arc::new(ModbusTcpTransport::new(&config.modbus, config.slave_id)))
    }

    #[cfg(not(feature = "tcp"))]
    {
        Err(duco_core::Error::Config(
            "built without the `tcp` feature; only the fake transport is available".to_string(),
        ))
    }
}

/// Transport kinds compiled into this build.
pub fn available_transports() -> Vec<&'static str> {
    let mut transports = vec!["fake"];

    #[cfg(feature = "tcp")]
    transports.push("modbus-tcp");

    transports
}
