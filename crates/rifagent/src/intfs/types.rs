//! Router-interface state types.

use nos_hal::VrfHandle;
use nos_types::IpPrefix;
use std::collections::HashSet;
use std::fmt;

/// What an interface route does when it is the active entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// Subnet route out of the interface's RIF.
    Subnet,
    /// Host route punting the interface's own address to the CPU.
    Ip2Me,
    /// Directed-broadcast neighbor for an IPv4 VLAN subnet.
    Bcast,
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteKind::Subnet => "subnet",
            RouteKind::Ip2Me => "ip2me",
            RouteKind::Bcast => "bcast",
        };
        write!(f, "{}", s)
    }
}

/// One interface route in the overlap index.
///
/// Identity within an overlap list is `(prefix, iface)`; `kind` selects the
/// HAL operation when the entry becomes or stops being the active head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntfRoute {
    pub prefix: IpPrefix,
    pub iface: String,
    pub kind: RouteKind,
}

impl IntfRoute {
    pub fn new(prefix: IpPrefix, iface: impl Into<String>, kind: RouteKind) -> Self {
        Self {
            prefix,
            iface: iface.into(),
            kind,
        }
    }
}

impl fmt::Display for IntfRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} on {}", self.kind, self.prefix, self.iface)
    }
}

/// Per-interface RIF state.
///
/// Loopback interfaces keep a sentinel entry: no hardware RIF exists and
/// the address set is not maintained for them.
#[derive(Debug, Clone)]
pub struct RifEntry {
    pub addresses: HashSet<IpPrefix>,
    pub ref_count: u32,
    pub vrf: VrfHandle,
    pub mtu: u32,
}

impl RifEntry {
    pub fn new(vrf: VrfHandle, mtu: u32) -> Self {
        Self {
            addresses: HashSet::new(),
            ref_count: 0,
            vrf,
            mtu,
        }
    }

    /// Increments the reference count and returns the new value.
    pub fn add_ref(&mut self) -> u32 {
        self.ref_count = self.ref_count.saturating_add(1);
        self.ref_count
    }

    /// Decrements the reference count and returns the new value, or `None`
    /// on underflow.
    pub fn remove_ref(&mut self) -> Option<u32> {
        self.ref_count = self.ref_count.checked_sub(1)?;
        Some(self.ref_count)
    }

    /// Returns true if higher layers still hold this RIF.
    pub fn is_referenced(&self) -> bool {
        self.ref_count > 0
    }
}
