//! Interface-address publication.

use crate::bus::AppStateTable;
use crate::error::BusError;
use crate::state::IntfStateView;
use crate::types::{AddressEntry, AddressMessageType};
use std::sync::Arc;
use tracing::{debug, info};

/// Interfaces whose addresses are never published.
const DUMMY_INTF_NAME: &str = "dummy";
const USB_INTF_NAME: &str = "usb0";

/// Publishes kernel interface addresses to the application bus.
pub struct AddrSync {
    table: Arc<dyn AppStateTable>,
    state: IntfStateView,
}

impl AddrSync {
    pub fn new(table: Arc<dyn AppStateTable>) -> Self {
        Self {
            table,
            state: IntfStateView::new(),
        }
    }

    /// Returns the readiness view for the state-table follower to update.
    pub fn state_mut(&mut self) -> &mut IntfStateView {
        &mut self.state
    }

    /// Handles one decoded address event.
    pub fn on_addr_msg(
        &self,
        msg_type: AddressMessageType,
        entry: &AddressEntry,
    ) -> Result<(), BusError> {
        // Link-local noise on special interfaces is not interesting
        if entry.interface == DUMMY_INTF_NAME || entry.interface == USB_INTF_NAME {
            info!(interface = %entry.interface, address = %entry.address,
                  "address on special interface ignored");
            return Ok(());
        }

        // After a config reload the kernel can still report addresses on
        // interfaces the port manager has not re-created yet
        if !self.state.is_intf_state_ok(&entry.interface) {
            info!(interface = %entry.interface, address = %entry.address,
                  "interface not ready, address event skipped");
            return Ok(());
        }

        let key = entry.bus_key();
        match msg_type {
            AddressMessageType::Del => {
                self.table.del(&key)?;
                info!(key, "address withdrawn");
            }
            AddressMessageType::New | AddressMessageType::Get => {
                let fvs = vec![
                    ("scope".to_string(), entry.scope.to_string()),
                    ("family".to_string(), entry.family().to_string()),
                ];
                self.table.set(&key, &fvs)?;
                debug!(key, scope = %entry.scope, family = entry.family(), "address published");
            }
        }

        Ok(())
    }
}
