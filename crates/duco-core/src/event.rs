//! Events published by the refresh machinery.

use serde::{Deserialize, Serialize};

use crate::register::{RawValue, RegisterAddress};

/// Event emitted on the Duco event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DucoEvent {
    /// A node answered during topology discovery
    NodeDiscovered {
        base: RegisterAddress,
        kind: String,
        zone: Option<i32>,
        timestamp: i64,
    },

    /// A refresh completed and a new snapshot is current
    SnapshotPublished {
        values: usize,
        missed_runs: usize,
        timestamp: i64,
    },

    /// A refresh failed; the previous snapshot is still current but stale
    RefreshFailed { reason: String, timestamp: i64 },

    /// A holding register was written
    RegisterWritten {
        address: RegisterAddress,
        value: RawValue,
        timestamp: i64,
    },
}

impl DucoEvent {
    /// Get the event type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NodeDiscovered { .. } => "NodeDiscovered",
            Self::SnapshotPublished { .. } => "SnapshotPublished",
            Self::RefreshFailed { .. } => "RefreshFailed",
            Self::RegisterWritten { .. } => "RegisterWritten",
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            Self::NodeDiscovered { timestamp, .. }
            | Self::SnapshotPublished { timestamp, .. }
            | Self::RefreshFailed { timestamp, .. }
            | Self::RegisterWritten { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this event reports the outcome of a refresh cycle.
    pub fn is_refresh_event(&self) -> bool {
        matches!(
            self,
            Self::SnapshotPublished { .. } | Self::RefreshFailed { .. }
        )
    }
}

/// Metadata attached to every published event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event id
    pub event_id: String,
    /// Component that published the event
    pub source: String,
    /// Unix timestamp (milliseconds) of publication
    pub published_at: i64,
}

impl EventMetadata {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            published_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
