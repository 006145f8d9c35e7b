//! Decoded kernel event types.

use nos_types::{IpAddress, IpPrefix, MacAddress};
use std::fmt;

/// Address message kind (NEWADDR / GETADDR / DELADDR).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMessageType {
    New,
    Get,
    Del,
}

/// Kernel address scope as published on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrScope {
    /// Universe-scoped addresses.
    Global,
    /// Everything else (link, host, site).
    Local,
}

impl fmt::Display for AddrScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddrScope::Global => write!(f, "global"),
            AddrScope::Local => write!(f, "local"),
        }
    }
}

/// One decoded interface address event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressEntry {
    pub interface: String,
    pub address: IpPrefix,
    pub scope: AddrScope,
}

impl AddressEntry {
    /// Bus key: `"<iface>:<addr>"`.
    pub fn bus_key(&self) -> String {
        format!("{}:{}", self.interface, self.address)
    }

    /// Published `family` field value.
    pub fn family(&self) -> &'static str {
        if self.address.is_ipv4() {
            "IPv4"
        } else {
            "IPv6"
        }
    }
}

/// Neighbor message kind (NEWNEIGH / GETNEIGH / DELNEIGH).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborMessageType {
    New,
    Get,
    Del,
}

/// Kernel neighbor cache states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborState {
    Incomplete,
    Reachable,
    Stale,
    Delay,
    Probe,
    Failed,
    NoArp,
    Permanent,
}

impl NeighborState {
    /// Returns true if the entry carries a usable MAC.
    pub fn is_resolved(&self) -> bool {
        !matches!(self, NeighborState::Incomplete | NeighborState::Failed)
    }
}

/// One decoded neighbor event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NeighborEntry {
    pub interface: String,
    pub ip: IpAddress,
    pub mac: MacAddress,
    pub state: NeighborState,
}

impl NeighborEntry {
    /// Bus key: `"<iface>:<ip>"`.
    pub fn bus_key(&self) -> String {
        format!("{}:{}", self.interface, self.ip)
    }

    /// Published `family` field value.
    pub fn family(&self) -> &'static str {
        if self.ip.is_ipv4() {
            "IPv4"
        } else {
            "IPv6"
        }
    }

    /// Returns true for IPv6 link-local multicast destinations, which are
    /// never published.
    pub fn is_ipv6_link_local_multicast(&self) -> bool {
        self.ip
            .as_ipv6()
            .map(|v6| v6.is_link_local_multicast())
            .unwrap_or(false)
    }
}
