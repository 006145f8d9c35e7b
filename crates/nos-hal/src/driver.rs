//! The raw forwarding-plane driver boundary.

use crate::error::HalResult;
use crate::types::{LagHandle, PortHandle, RouterInterfaceHandle, VlanHandle, VrfHandle};
use nos_types::{IpPrefix, Ipv4Address, MacAddress};

/// What a router interface is bound to in hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RifBinding {
    /// Port-typed RIF over a physical port.
    Port(PortHandle),
    /// Port-typed RIF over a LAG.
    Lag(LagHandle),
    /// VLAN-typed RIF over a VLAN.
    Vlan(VlanHandle),
}

/// Attributes for a router-interface create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RifSpec {
    pub binding: RifBinding,
    pub vrf: VrfHandle,
    pub src_mac: MacAddress,
    pub mtu: u32,
}

/// A route entry key: destination prefix within a virtual router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub vrf: VrfHandle,
    pub destination: IpPrefix,
}

impl RouteKey {
    pub fn new(vrf: VrfHandle, destination: IpPrefix) -> Self {
        Self { vrf, destination }
    }
}

/// Next hop of an installed route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteNextHop {
    /// Forward out of a router interface (subnet routes).
    RouterInterface(RouterInterfaceHandle),
    /// Punt to the CPU port (IP2Me routes).
    CpuPort(PortHandle),
}

impl RouteNextHop {
    /// Returns the router-interface handle for RIF-bound hops.
    pub fn as_rif(&self) -> Option<RouterInterfaceHandle> {
        match self {
            RouteNextHop::RouterInterface(rif) => Some(*rif),
            RouteNextHop::CpuPort(_) => None,
        }
    }
}

/// The driver every forwarding plane implements.
///
/// Calls are synchronous and carry no policy: idempotency, counters and
/// observer notification live in [`crate::HalGateway`]. Implementations must
/// return the taxonomy errors of [`crate::HalError`] so the reconciler can
/// route on them.
pub trait SwitchDriver: Send + Sync {
    /// Creates a router interface and returns its handle.
    fn create_router_interface(&self, spec: &RifSpec) -> HalResult<RouterInterfaceHandle>;

    /// Updates the MTU of an existing router interface.
    fn set_router_interface_mtu(&self, rif: RouterInterfaceHandle, mtu: u32) -> HalResult<()>;

    /// Removes a router interface.
    fn remove_router_interface(&self, rif: RouterInterfaceHandle) -> HalResult<()>;

    /// Installs a route entry.
    fn create_route(&self, key: &RouteKey, next_hop: RouteNextHop) -> HalResult<()>;

    /// Removes a route entry.
    fn remove_route(&self, key: &RouteKey) -> HalResult<()>;

    /// Installs a neighbor entry on a router interface.
    fn create_neighbor(
        &self,
        rif: RouterInterfaceHandle,
        ip: Ipv4Address,
        mac: MacAddress,
    ) -> HalResult<()>;

    /// Removes a neighbor entry.
    fn remove_neighbor(&self, rif: RouterInterfaceHandle, ip: Ipv4Address) -> HalResult<()>;
}
