//! In-memory driver for tests.

use crate::driver::{RifSpec, RouteKey, RouteNextHop, SwitchDriver};
use crate::error::{HalError, HalResult};
use crate::types::{RouterInterfaceHandle, VrfHandle};
use nos_types::{IpPrefix, Ipv4Address, MacAddress};
use parking_lot::Mutex;
use std::collections::HashMap;

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    CreateRif(RouterInterfaceHandle),
    SetRifMtu(RouterInterfaceHandle, u32),
    RemoveRif(RouterInterfaceHandle),
    CreateRoute(RouteKey, RouteNextHop),
    RemoveRoute(RouteKey),
    CreateNeighbor(RouterInterfaceHandle, Ipv4Address),
    RemoveNeighbor(RouterInterfaceHandle, Ipv4Address),
}

#[derive(Default)]
struct MockState {
    next_raw: u64,
    calls: u64,
    rifs: HashMap<RouterInterfaceHandle, RifSpec>,
    routes: HashMap<RouteKey, RouteNextHop>,
    neighbors: HashMap<(RouterInterfaceHandle, Ipv4Address), MacAddress>,
    history: Vec<MockOp>,
    scheduled_failures: HashMap<u64, HalError>,
}

/// A driver that keeps the installed state in memory.
///
/// Every successful call is appended to a history for assertion. Failures
/// are scheduled against a call counter: [`MockSwitchDriver::inject_failure`]
/// fails the next unscheduled call (stacking for consecutive failures), and
/// [`MockSwitchDriver::inject_failure_at`] fails the nth call from now. A
/// failed call changes no state.
#[derive(Default)]
pub struct MockSwitchDriver {
    state: Mutex<MockState>,
}

impl MockSwitchDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next driver call that has no failure scheduled yet.
    pub fn inject_failure(&self, error: HalError) {
        let mut state = self.state.lock();
        let mut call = state.calls;
        while state.scheduled_failures.contains_key(&call) {
            call += 1;
        }
        state.scheduled_failures.insert(call, error);
    }

    /// Fails the driver call `offset` calls from now (0 = next call).
    pub fn inject_failure_at(&self, offset: u64, error: HalError) {
        let mut state = self.state.lock();
        let call = state.calls + offset;
        state.scheduled_failures.insert(call, error);
    }

    /// Returns the next hop of an installed route, if any.
    pub fn route(&self, key: &RouteKey) -> Option<RouteNextHop> {
        self.state.lock().routes.get(key).copied()
    }

    /// Looks up a route by VRF and destination string.
    pub fn route_to(&self, vrf: VrfHandle, destination: &str) -> Option<RouteNextHop> {
        let destination: IpPrefix = destination.parse().ok()?;
        self.route(&RouteKey::new(vrf, destination))
    }

    /// Returns all installed routes.
    pub fn routes(&self) -> HashMap<RouteKey, RouteNextHop> {
        self.state.lock().routes.clone()
    }

    /// Returns the number of installed routes.
    pub fn route_count(&self) -> usize {
        self.state.lock().routes.len()
    }

    /// Returns the number of live router interfaces.
    pub fn rif_count(&self) -> usize {
        self.state.lock().rifs.len()
    }

    /// Returns the spec a router interface was created with.
    pub fn rif_spec(&self, rif: RouterInterfaceHandle) -> Option<RifSpec> {
        self.state.lock().rifs.get(&rif).copied()
    }

    /// Returns the MAC of an installed neighbor entry.
    pub fn neighbor(&self, rif: RouterInterfaceHandle, ip: Ipv4Address) -> Option<MacAddress> {
        self.state.lock().neighbors.get(&(rif, ip)).copied()
    }

    /// Returns the number of installed neighbor entries.
    pub fn neighbor_count(&self) -> usize {
        self.state.lock().neighbors.len()
    }

    /// Returns the recorded call history.
    pub fn history(&self) -> Vec<MockOp> {
        self.state.lock().history.clone()
    }

    /// Clears the recorded call history (installed state is kept).
    pub fn clear_history(&self) {
        self.state.lock().history.clear();
    }

    fn take_failure(state: &mut MockState) -> HalResult<()> {
        let call = state.calls;
        state.calls += 1;
        match state.scheduled_failures.remove(&call) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl SwitchDriver for MockSwitchDriver {
    fn create_router_interface(&self, spec: &RifSpec) -> HalResult<RouterInterfaceHandle> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        state.next_raw += 1;
        let rif = RouterInterfaceHandle::from_raw_unchecked(state.next_raw);
        state.rifs.insert(rif, *spec);
        state.history.push(MockOp::CreateRif(rif));
        Ok(rif)
    }

    fn set_router_interface_mtu(&self, rif: RouterInterfaceHandle, mtu: u32) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        let spec = state.rifs.get_mut(&rif).ok_or(HalError::NotFound)?;
        spec.mtu = mtu;
        state.history.push(MockOp::SetRifMtu(rif, mtu));
        Ok(())
    }

    fn remove_router_interface(&self, rif: RouterInterfaceHandle) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if state.rifs.remove(&rif).is_none() {
            return Err(HalError::NotFound);
        }
        state.history.push(MockOp::RemoveRif(rif));
        Ok(())
    }

    fn create_route(&self, key: &RouteKey, next_hop: RouteNextHop) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if state.routes.contains_key(key) {
            return Err(HalError::AlreadyExists);
        }
        state.routes.insert(*key, next_hop);
        state.history.push(MockOp::CreateRoute(*key, next_hop));
        Ok(())
    }

    fn remove_route(&self, key: &RouteKey) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if state.routes.remove(key).is_none() {
            return Err(HalError::NotFound);
        }
        state.history.push(MockOp::RemoveRoute(*key));
        Ok(())
    }

    fn create_neighbor(
        &self,
        rif: RouterInterfaceHandle,
        ip: Ipv4Address,
        mac: MacAddress,
    ) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if state.neighbors.contains_key(&(rif, ip)) {
            return Err(HalError::AlreadyExists);
        }
        state.neighbors.insert((rif, ip), mac);
        state.history.push(MockOp::CreateNeighbor(rif, ip));
        Ok(())
    }

    fn remove_neighbor(&self, rif: RouterInterfaceHandle, ip: Ipv4Address) -> HalResult<()> {
        let mut state = self.state.lock();
        Self::take_failure(&mut state)?;

        if state.neighbors.remove(&(rif, ip)).is_none() {
            return Err(HalError::NotFound);
        }
        state.history.push(MockOp::RemoveNeighbor(rif, ip));
        Ok(())
    }
}
