//! Integration lifecycle.
//!
//! Setup order: discover the topology, create the coordinator, build the
//! entities (which declares their registers), run the first refresh, then
//! start the periodic timer.

use std::sync::Arc;

use tracing::info;

use duco_core::{DucoConfig, DucoEvent, EventBus, Result, SharedTransport};

use crate::coordinator::Coordinator;
use crate::discovery::discover_topology;
use crate::entities::{build_entities, DucoEntity, EntityState};
use crate::node::NodeHandle;

const EVENT_SOURCE: &str = "duco.discovery";

/// A set-up Duco box with its entities.
pub struct DucoIntegration {
    slave_id: u8,
    nodes: Vec<NodeHandle>,
    coordinator: Arc<Coordinator>,
    entities: Vec<DucoEntity>,
}

impl DucoIntegration {
    /// Set up the integration and start polling.
    ///
    /// Errors for which [`duco_core::Error::is_not_ready`] holds mean the box
    /// could not be reached and setup should be retried later.
    pub async fn setup(transport: SharedTransport, config: &DucoConfig) -> Result<Self> {
        Self::setup_with_event_bus(transport, config, EventBus::with_name("duco")).await
    }

    pub async fn setup_with_event_bus(
        transport: SharedTransport,
        config: &DucoConfig,
        event_bus: EventBus,
    ) -> Result<Self> {
        config.validate()?;

        let nodes = discover_topology(transport.as_ref()).await?;
        for node in &nodes {
            event_bus.publish_with_source(
                DucoEvent::NodeDiscovered {
                    base: node.base,
                    kind: node.kind.to_string(),
                    zone: node.zone,
                    timestamp: chrono::Utc::now().timestamp_millis(),
                },
                EVENT_SOURCE,
            );
        }

        let coordinator = Arc::new(Coordinator::with_event_bus(
            transport,
            config.update_interval(),
            event_bus,
        ));
        let entities = build_entities(&coordinator, &nodes, config.slave_id);
        info!(
            "Set up {} node(s) with {} entities, {} call(s) per refresh",
            nodes.len(),
            entities.len(),
            coordinator.planned_calls()
        );

        coordinator.first_refresh().await?;
        coordinator.start();

        Ok(Self {
            slave_id: config.slave_id,
            nodes,
            coordinator,
            entities,
        })
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn nodes(&self) -> &[NodeHandle] {
        &self.nodes
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn entities(&self) -> &[DucoEntity] {
        &self.entities
    }

    pub fn entity(&self, unique_id: &str) -> Option<&DucoEntity> {
        self.entities
            .iter()
            .find(|entity| entity.unique_id() == unique_id)
    }

    pub fn states(&self) -> Vec<EntityState> {
        self.entities.iter().map(DucoEntity::state).collect()
    }

    /// Stop polling and drop the entities.
    pub async fn unload(self) {
        self.coordinator.shutdown().await;
        info!("Unloaded {} entities", self.entities.len());
    }
}
