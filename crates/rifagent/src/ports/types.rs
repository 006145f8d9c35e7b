//! Port descriptor.

use nos_hal::{LagHandle, PortHandle, RifBinding, RouterInterfaceHandle, VlanHandle, VrfHandle};
use nos_types::PortKind;

/// A port as the reconciler sees it.
///
/// Identity is `alias`. Everything except the RIF handle and the VRF
/// back-reference is owned by the external port manager; the reconciler
/// writes those two back through [`super::PortDirectory::set_port`] after a
/// successful RIF create or remove.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Port {
    pub alias: String,
    pub kind: PortKind,
    pub port_handle: PortHandle,
    pub lag_handle: LagHandle,
    pub vlan_handle: VlanHandle,
    pub mtu: u32,
    /// Router interface bound to this port, if any.
    pub rif: Option<RouterInterfaceHandle>,
    /// Virtual router the RIF was created in, if any.
    pub vrf: Option<VrfHandle>,
}

/// Default MTU for ports created without one.
pub(crate) const DEFAULT_MTU: u32 = 9100;

impl Port {
    /// Creates a physical port descriptor.
    pub fn phy(alias: impl Into<String>, port_handle: PortHandle, mtu: u32) -> Self {
        Self {
            alias: alias.into(),
            kind: PortKind::Phy,
            port_handle,
            lag_handle: LagHandle::NULL,
            vlan_handle: VlanHandle::NULL,
            mtu,
            rif: None,
            vrf: None,
        }
    }

    /// Creates a LAG descriptor.
    pub fn lag(alias: impl Into<String>, lag_handle: LagHandle, mtu: u32) -> Self {
        Self {
            alias: alias.into(),
            kind: PortKind::Lag,
            port_handle: PortHandle::NULL,
            lag_handle,
            vlan_handle: VlanHandle::NULL,
            mtu,
            rif: None,
            vrf: None,
        }
    }

    /// Creates a VLAN interface descriptor.
    pub fn vlan(alias: impl Into<String>, vlan_handle: VlanHandle, mtu: u32) -> Self {
        Self {
            alias: alias.into(),
            kind: PortKind::Vlan,
            port_handle: PortHandle::NULL,
            lag_handle: LagHandle::NULL,
            vlan_handle,
            mtu,
            rif: None,
            vrf: None,
        }
    }

    /// Creates a loopback descriptor. Loopbacks never allocate a hardware
    /// RIF.
    pub fn loopback(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            kind: PortKind::Loopback,
            port_handle: PortHandle::NULL,
            lag_handle: LagHandle::NULL,
            vlan_handle: VlanHandle::NULL,
            mtu: DEFAULT_MTU,
            rif: None,
            vrf: None,
        }
    }

    /// Creates the CPU port descriptor.
    pub fn cpu(alias: impl Into<String>, port_handle: PortHandle) -> Self {
        Self {
            alias: alias.into(),
            kind: PortKind::Cpu,
            port_handle,
            lag_handle: LagHandle::NULL,
            vlan_handle: VlanHandle::NULL,
            mtu: DEFAULT_MTU,
            rif: None,
            vrf: None,
        }
    }

    /// Returns what a RIF on this port binds to in hardware, by exhaustive
    /// kind analysis. Loopback and CPU ports never carry a hardware RIF.
    pub fn rif_binding(&self) -> Option<RifBinding> {
        match self.kind {
            PortKind::Phy => Some(RifBinding::Port(self.port_handle)),
            PortKind::Lag => Some(RifBinding::Lag(self.lag_handle)),
            PortKind::Vlan => Some(RifBinding::Vlan(self.vlan_handle)),
            PortKind::Loopback | PortKind::Cpu => None,
        }
    }
}
