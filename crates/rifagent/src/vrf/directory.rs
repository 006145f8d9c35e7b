//! Directory of virtual-router handles.

use nos_hal::VrfHandle;
use std::collections::HashMap;

/// Maps VRF and VNet names to their virtual-router handles.
///
/// Membership is owned by the external VRF/VNet managers; the reconciler
/// only resolves names and defers events whose VRF or VNet is not present
/// yet. An empty name resolves to the default virtual router.
#[derive(Debug)]
pub struct VrfDirectory {
    default_vrf: VrfHandle,
    vrfs: HashMap<String, VrfHandle>,
    vnets: HashMap<String, VrfHandle>,
}

impl VrfDirectory {
    pub fn new(default_vrf: VrfHandle) -> Self {
        Self {
            default_vrf,
            vrfs: HashMap::new(),
            vnets: HashMap::new(),
        }
    }

    /// Returns the default virtual-router handle.
    pub fn default_vrf(&self) -> VrfHandle {
        self.default_vrf
    }

    /// Resolves a VRF name. Empty names resolve to the default VRF.
    pub fn get_vrf(&self, name: &str) -> Option<VrfHandle> {
        if name.is_empty() {
            return Some(self.default_vrf);
        }
        self.vrfs.get(name).copied()
    }

    /// Resolves a VNet name.
    pub fn get_vnet(&self, name: &str) -> Option<VrfHandle> {
        self.vnets.get(name).copied()
    }

    /// Registers a VRF.
    pub fn add_vrf(&mut self, name: impl Into<String>, handle: VrfHandle) {
        self.vrfs.insert(name.into(), handle);
    }

    /// Removes a VRF registration.
    pub fn remove_vrf(&mut self, name: &str) -> Option<VrfHandle> {
        self.vrfs.remove(name)
    }

    /// Registers a VNet.
    pub fn add_vnet(&mut self, name: impl Into<String>, handle: VrfHandle) {
        self.vnets.insert(name.into(), handle);
    }

    /// Removes a VNet registration.
    pub fn remove_vnet(&mut self, name: &str) -> Option<VrfHandle> {
        self.vnets.remove(name)
    }
}
