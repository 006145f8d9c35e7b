//! Port kind classification for router-interface handling.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of port a Layer-3 interface is bound to.
///
/// The kind drives the router-interface create attributes: PHY and LAG
/// ports become port-typed RIFs, VLAN interfaces become VLAN-typed RIFs,
/// and loopback/CPU ports never allocate a hardware RIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    /// Physical front-panel port.
    Phy,
    /// Link Aggregation Group (port-channel).
    Lag,
    /// VLAN interface (SVI).
    Vlan,
    /// Loopback interface.
    Loopback,
    /// CPU port for punted traffic.
    Cpu,
}

impl PortKind {
    /// Returns true if this kind carries a hardware router interface.
    pub const fn has_hw_rif(&self) -> bool {
        matches!(self, PortKind::Phy | PortKind::Lag | PortKind::Vlan)
    }

    /// Returns true if this is the loopback kind.
    pub const fn is_loopback(&self) -> bool {
        matches!(self, PortKind::Loopback)
    }
}

impl fmt::Display for PortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PortKind::Phy => "phy",
            PortKind::Lag => "lag",
            PortKind::Vlan => "vlan",
            PortKind::Loopback => "loopback",
            PortKind::Cpu => "cpu",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PortKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "phy" => Ok(PortKind::Phy),
            "lag" => Ok(PortKind::Lag),
            "vlan" => Ok(PortKind::Vlan),
            "loopback" => Ok(PortKind::Loopback),
            "cpu" => Ok(PortKind::Cpu),
            _ => Err(ParseError::InvalidPortKind(s.to_string())),
        }
    }
}
