//! Neighbor publication.

use crate::bus::AppStateTable;
use crate::error::BusError;
use crate::types::{NeighborEntry, NeighborMessageType};
use std::sync::Arc;
use tracing::{debug, info};

/// Publishes kernel neighbor entries to the application bus.
pub struct NeighSync {
    table: Arc<dyn AppStateTable>,
}

impl NeighSync {
    pub fn new(table: Arc<dyn AppStateTable>) -> Self {
        Self { table }
    }

    /// Handles one decoded neighbor event.
    pub fn on_neigh_msg(
        &self,
        msg_type: NeighborMessageType,
        entry: &NeighborEntry,
    ) -> Result<(), BusError> {
        if entry.is_ipv6_link_local_multicast() {
            debug!(ip = %entry.ip, "IPv6 link-local multicast neighbor ignored");
            return Ok(());
        }

        let key = entry.bus_key();
        if Self::should_delete(msg_type, entry) {
            self.table.del(&key)?;
            info!(key, "neighbor withdrawn");
            return Ok(());
        }

        let fvs = vec![
            ("family".to_string(), entry.family().to_string()),
            ("neigh".to_string(), entry.mac.to_string()),
        ];
        self.table.set(&key, &fvs)?;
        debug!(key, mac = %entry.mac, "neighbor published");
        Ok(())
    }

    /// DELNEIGH always withdraws; NEW/GET withdraw when the kernel lost
    /// the resolution (NUD_INCOMPLETE / NUD_FAILED).
    fn should_delete(msg_type: NeighborMessageType, entry: &NeighborEntry) -> bool {
        match msg_type {
            NeighborMessageType::Del => true,
            NeighborMessageType::New | NeighborMessageType::Get => !entry.state.is_resolved(),
        }
    }
}
