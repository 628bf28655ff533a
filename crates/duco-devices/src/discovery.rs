//! Topology discovery.
//!
//! The master unit always sits at base address 10. Up to five further
//! modules live at bases 20 through 60; each is identified by its module-kind
//! register and tagged with its location number.

use tracing::{debug, info, warn};

use duco_core::{Error, RegisterAddress, RegisterTransport, Result};

use crate::model::ModuleKind;
use crate::node::NodeHandle;
use crate::registers::{LOCATION_NUMBER, MODULE_KIND};

/// Base address of the master unit.
pub const MASTER_BASE: RegisterAddress = 10;

/// Base addresses probed for additional modules, in probe order.
pub const PROBE_BASES: [RegisterAddress; 5] = [20, 30, 40, 50, 60];

/// Probe the bus and return every node found, master first.
///
/// Whatever known module answers at [`MASTER_BASE`] is recorded as the master
/// unit. Fails with [`Error::NoMasterFound`] when nothing recognisable answers
/// there, or [`Error::TransportUnreachable`] when the bus itself is down. Both
/// mean setup should be retried later.
pub async fn discover_topology(transport: &dyn RegisterTransport) -> Result<Vec<NodeHandle>> {
    match MODULE_KIND.read_direct(transport, MASTER_BASE).await? {
        Some(Some(ModuleKind::MasterUnit)) => {}
        Some(Some(other)) => {
            warn!(
                "Module at master base {} reports {}, treating it as {}",
                MASTER_BASE,
                other,
                ModuleKind::MasterUnit
            );
        }
        _ => return Err(Error::NoMasterFound(MASTER_BASE)),
    }

    info!("Detected {} at {} on {}", ModuleKind::MasterUnit, MASTER_BASE, transport.name());
    let mut nodes = vec![NodeHandle::new(MASTER_BASE, ModuleKind::MasterUnit, None)];

    for base in PROBE_BASES {
        let kind = match MODULE_KIND.read_direct(transport, base).await {
            Ok(Some(Some(kind))) => kind,
            Ok(Some(None)) => {
                debug!("Unrecognised module kind at base {}", base);
                continue;
            }
            Ok(None) => {
                debug!("No module at base {}", base);
                continue;
            }
            Err(e) => {
                warn!("Probe at base {} failed: {}", base, e);
                continue;
            }
        };

        if kind == ModuleKind::MasterUnit {
            warn!("Ignoring second master unit reported at base {}", base);
            continue;
        }

        let zone = match LOCATION_NUMBER.read_direct(transport, base).await {
            Ok(zone) => zone,
            Err(e) => {
                warn!("Location read at base {} failed: {}", base, e);
                None
            }
        };

        info!("Detected {} at {} (zone {:?})", kind, base, zone);
        nodes.push(NodeHandle::new(base, kind, zone));
    }

    Ok(nodes)
}
