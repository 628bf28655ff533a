//! Ventilation status select entity.

use std::sync::Arc;

use tracing::info;

use duco_core::Result;

use super::{EntityBase, EntityKind, EntityState, EntityValue};
use crate::capability::SelectDescription;
use crate::coordinator::Coordinator;
use crate::model::VentilationStatus;
use crate::node::NodeHandle;
use crate::registers::{
    NO_OVERRIDE, TARGET_VENTILATION_PERCENTAGE, VENTILATION_ACTION, VENTILATION_STATUS,
};

pub struct DucoSelect {
    pub(crate) base: EntityBase,
    description: &'static SelectDescription,
}

impl DucoSelect {
    pub fn new(
        coordinator: &Arc<Coordinator>,
        node: NodeHandle,
        description: &'static SelectDescription,
        slave_id: u8,
    ) -> Self {
        coordinator.attach(&VENTILATION_STATUS, node.base);
        Self {
            base: EntityBase::new(coordinator, node, description.key, description.name, slave_id),
            description,
        }
    }

    pub fn options(&self) -> &'static [VentilationStatus] {
        self.description.options
    }

    pub fn current_option(&self) -> Option<VentilationStatus> {
        self.base
            .coordinator
            .read(&VENTILATION_STATUS, self.base.node.base)
            .flatten()
    }

    /// Request a ventilation status by name.
    ///
    /// Only statuses with a write command can be requested; anything else
    /// fails with `NotWritable` before any bus traffic. The target override
    /// is cleared first so the box follows the requested mode.
    pub async fn select_option(&self, option: &str) -> Result<()> {
        let status: VentilationStatus = option.parse()?;
        VENTILATION_ACTION.encode(&status)?;

        let coordinator = &self.base.coordinator;
        let base = self.base.node.base;
        info!("Selecting {} on {}", status, self.base.unique_id);
        coordinator
            .write(&TARGET_VENTILATION_PERCENTAGE, base, &NO_OVERRIDE)
            .await?;
        coordinator.write(&VENTILATION_ACTION, base, &status).await
    }

    pub fn state(&self) -> EntityState {
        self.base.state(
            EntityKind::Select,
            self.current_option()
                .map(|status| EntityValue::Option(status.as_str())),
            None,
        )
    }
}
