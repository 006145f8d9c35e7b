//! Interface readiness view.

use std::collections::HashSet;

const VLAN_PREFIX: &str = "Vlan";
const LAG_PREFIX: &str = "PortChannel";
const PORT_PREFIX: &str = "Ethernet";

/// Mirror of the port/LAG/VLAN state tables.
///
/// Addresses on interfaces that are not yet marked ready are dropped: after
/// a config reload the kernel still reports addresses on interfaces the
/// port manager has not re-created.
#[derive(Debug, Default)]
pub struct IntfStateView {
    ready_ports: HashSet<String>,
    ready_lags: HashSet<String>,
    ready_vlans: HashSet<String>,
}

impl IntfStateView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_port_ready(&mut self, alias: impl Into<String>) {
        self.ready_ports.insert(alias.into());
    }

    pub fn mark_lag_ready(&mut self, alias: impl Into<String>) {
        self.ready_lags.insert(alias.into());
    }

    pub fn mark_vlan_ready(&mut self, alias: impl Into<String>) {
        self.ready_vlans.insert(alias.into());
    }

    pub fn clear_port(&mut self, alias: &str) {
        self.ready_ports.remove(alias);
    }

    pub fn clear_lag(&mut self, alias: &str) {
        self.ready_lags.remove(alias);
    }

    pub fn clear_vlan(&mut self, alias: &str) {
        self.ready_vlans.remove(alias);
    }

    /// Returns true if the interface is present in its state table.
    /// Aliases outside the port/LAG/VLAN namespaces are always ready.
    pub fn is_intf_state_ok(&self, alias: &str) -> bool {
        if alias.starts_with(VLAN_PREFIX) {
            self.ready_vlans.contains(alias)
        } else if alias.starts_with(LAG_PREFIX) {
            self.ready_lags.contains(alias)
        } else if alias.starts_with(PORT_PREFIX) {
            self.ready_ports.contains(alias)
        } else {
            true
        }
    }
}
