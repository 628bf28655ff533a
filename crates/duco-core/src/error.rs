//! Error types shared across the workspace.

use thiserror::Error;

use crate::register::{AccessClass, RegisterAddress};
use crate::transport::TransportError;

/// Result type for Duco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for register, refresh and setup operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The bus could not be reached at all; no snapshot was produced.
    #[error("Transport unreachable: {0}")]
    TransportUnreachable(String),

    /// A batched read returned nothing for a run of addresses.
    #[error("Read miss for {count} {class} register(s) starting at {start}: {reason}")]
    PartialReadMiss {
        class: AccessClass,
        start: RegisterAddress,
        count: u16,
        reason: String,
    },

    /// No master unit answered at the master base address.
    #[error("No master unit found at base address {0}")]
    NoMasterFound(RegisterAddress),

    /// The register or value cannot be written.
    #[error("Not writable: {0}")]
    NotWritable(String),

    /// A value was rejected before reaching the bus.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A single write or direct read failed on the bus.
    #[error("Transport error: {0}")]
    Transport(TransportError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error means setup should be retried later rather than
    /// abandoned.
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NoMasterFound(_) | Self::TransportUnreachable(_))
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable(reason) => Self::TransportUnreachable(reason),
            other => Self::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_transport_error_maps_to_cycle_error() {
        let err: Error = TransportError::Unreachable("connection refused".to_string()).into();
        assert!(matches!(err, Error::TransportUnreachable(_)));
        assert!(err.is_not_ready());
    }

    #[test]
    fn test_other_transport_errors_stay_wrapped() {
        let err: Error = TransportError::Timeout(500).into();
        assert!(matches!(err, Error::Transport(TransportError::Timeout(500))));
        assert!(!err.is_not_ready());
    }

    #[test]
    fn test_error_display() {
        let err = Error::PartialReadMiss {
            class: AccessClass::Input,
            start: 24,
            count: 2,
            reason: "no value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Read miss for 2 input register(s) starting at 24: no value"
        );
        assert!(Error::NoMasterFound(10).to_string().contains("base address 10"));
    }
}
