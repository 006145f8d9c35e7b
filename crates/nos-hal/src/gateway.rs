//! The gateway the control plane talks to.

use crate::counters::{ResourceCounters, ResourceKind};
use crate::driver::{RifSpec, RouteKey, RouteNextHop, SwitchDriver};
use crate::error::{HalError, HalResult};
use crate::observer::{
    NextHopChange, NextHopEvent, NextHopObserver, ObserverHandle, ObserverRegistry,
};
use crate::types::RouterInterfaceHandle;
use nos_types::{Ipv4Address, MacAddress};
use std::sync::Arc;
use tracing::{debug, info};

/// Typed facade over the forwarding-plane driver.
///
/// Create and remove operations are idempotent at this layer: a create that
/// hits `AlreadyExists` or a remove that hits `NotFound` succeeds without
/// touching counters or observers, so a retried event never double-accounts.
pub struct HalGateway {
    driver: Arc<dyn SwitchDriver>,
    counters: ResourceCounters,
    observers: ObserverRegistry,
}

impl HalGateway {
    pub fn new(driver: Arc<dyn SwitchDriver>) -> Self {
        Self {
            driver,
            counters: ResourceCounters::new(),
            observers: ObserverRegistry::new(),
        }
    }

    /// Returns the route resource counters for telemetry readers.
    pub fn counters(&self) -> &ResourceCounters {
        &self.counters
    }

    /// Registers a next-hop-change observer.
    pub fn register_observer(&self, observer: Arc<dyn NextHopObserver>) -> ObserverHandle {
        self.observers.register(observer)
    }

    /// Deregisters a next-hop-change observer.
    pub fn unregister_observer(&self, handle: ObserverHandle) -> bool {
        self.observers.unregister(handle)
    }

    /// Creates a router interface.
    pub fn create_rif(&self, spec: &RifSpec) -> HalResult<RouterInterfaceHandle> {
        let rif = self.driver.create_router_interface(spec)?;
        info!(%rif, binding = ?spec.binding, vrf = %spec.vrf, mtu = spec.mtu,
              "created router interface");
        Ok(rif)
    }

    /// Updates the MTU of a router interface.
    pub fn set_rif_mtu(&self, rif: RouterInterfaceHandle, mtu: u32) -> HalResult<()> {
        self.driver.set_router_interface_mtu(rif, mtu)?;
        info!(%rif, mtu, "updated router interface MTU");
        Ok(())
    }

    /// Removes a router interface. Removing a RIF the hardware no longer
    /// knows is success.
    pub fn remove_rif(&self, rif: RouterInterfaceHandle) -> HalResult<()> {
        match self.driver.remove_router_interface(rif) {
            Ok(()) => {
                info!(%rif, "removed router interface");
                Ok(())
            }
            Err(HalError::NotFound) => {
                debug!(%rif, "router interface already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Installs a route. On an actual install the matching resource bucket
    /// is bumped and, for routes bound to a router interface, the next-hop
    /// observers are notified.
    pub fn create_route(&self, key: &RouteKey, next_hop: RouteNextHop) -> HalResult<()> {
        match self.driver.create_route(key, next_hop) {
            Ok(()) => {
                info!(destination = %key.destination, vrf = %key.vrf, ?next_hop, "created route");
                self.counters.increment(Self::route_bucket(key));
                if let Some(rif) = next_hop.as_rif() {
                    self.observers.notify(&NextHopEvent {
                        route: *key,
                        rif,
                        change: NextHopChange::Installed,
                    });
                }
                Ok(())
            }
            Err(HalError::AlreadyExists) => {
                debug!(destination = %key.destination, vrf = %key.vrf, "route already installed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Removes a route. `next_hop` is the hop the route was installed with;
    /// it selects the observers to notify.
    pub fn remove_route(&self, key: &RouteKey, next_hop: RouteNextHop) -> HalResult<()> {
        match self.driver.remove_route(key) {
            Ok(()) => {
                info!(destination = %key.destination, vrf = %key.vrf, "removed route");
                self.counters.decrement(Self::route_bucket(key));
                if let Some(rif) = next_hop.as_rif() {
                    self.observers.notify(&NextHopEvent {
                        route: *key,
                        rif,
                        change: NextHopChange::Removed,
                    });
                }
                Ok(())
            }
            Err(HalError::NotFound) => {
                debug!(destination = %key.destination, vrf = %key.vrf, "route already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Installs a directed-broadcast neighbor (destination MAC all-ones).
    pub fn create_bcast_neighbor(
        &self,
        rif: RouterInterfaceHandle,
        ip: Ipv4Address,
    ) -> HalResult<()> {
        match self.driver.create_neighbor(rif, ip, MacAddress::BROADCAST) {
            Ok(()) => {
                info!(%rif, %ip, "created directed-broadcast neighbor");
                Ok(())
            }
            Err(HalError::AlreadyExists) => {
                debug!(%rif, %ip, "broadcast neighbor already installed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Removes a directed-broadcast neighbor.
    pub fn remove_bcast_neighbor(
        &self,
        rif: RouterInterfaceHandle,
        ip: Ipv4Address,
    ) -> HalResult<()> {
        match self.driver.remove_neighbor(rif, ip) {
            Ok(()) => {
                info!(%rif, %ip, "removed directed-broadcast neighbor");
                Ok(())
            }
            Err(HalError::NotFound) => {
                debug!(%rif, %ip, "broadcast neighbor already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn route_bucket(key: &RouteKey) -> ResourceKind {
        if key.destination.is_ipv4() {
            ResourceKind::Ipv4Route
        } else {
            ResourceKind::Ipv6Route
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSwitchDriver;
    use crate::types::VrfHandle;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn gateway() -> (Arc<MockSwitchDriver>, HalGateway) {
        let driver = Arc::new(MockSwitchDriver::new());
        let gateway = HalGateway::new(driver.clone());
        (driver, gateway)
    }

    fn route_key(dest: &str) -> RouteKey {
        RouteKey::new(VrfHandle::from_raw(1).unwrap(), dest.parse().unwrap())
    }

    #[test]
    fn test_create_route_counts_by_family() {
        let (_, gateway) = gateway();
        let rif = RouterInterfaceHandle::from_raw(7).unwrap();

        gateway
            .create_route(&route_key("10.0.0.0/24"), RouteNextHop::RouterInterface(rif))
            .unwrap();
        gateway
            .create_route(
                &route_key("2001:db8::/64"),
                RouteNextHop::RouterInterface(rif),
            )
            .unwrap();

        assert_eq!(gateway.counters().used(ResourceKind::Ipv4Route), 1);
        assert_eq!(gateway.counters().used(ResourceKind::Ipv6Route), 1);
    }

    #[test]
    fn test_duplicate_create_is_idempotent() {
        let (_, gateway) = gateway();
        let rif = RouterInterfaceHandle::from_raw(7).unwrap();
        let key = route_key("10.0.0.0/24");

        gateway
            .create_route(&key, RouteNextHop::RouterInterface(rif))
            .unwrap();
        gateway
            .create_route(&key, RouteNextHop::RouterInterface(rif))
            .unwrap();

        // Second create did not double-count
        assert_eq!(gateway.counters().used(ResourceKind::Ipv4Route), 1);
    }

    #[test]
    fn test_remove_missing_route_is_idempotent() {
        let (_, gateway) = gateway();
        let rif = RouterInterfaceHandle::from_raw(7).unwrap();

        gateway
            .remove_route(&route_key("10.0.0.0/24"), RouteNextHop::RouterInterface(rif))
            .unwrap();
        assert_eq!(gateway.counters().used(ResourceKind::Ipv4Route), 0);
    }

    #[test]
    fn test_subnet_observer_notification() {
        struct Recorder(AtomicUsize, AtomicUsize);
        impl NextHopObserver for Recorder {
            fn on_next_hop_change(&self, event: &NextHopEvent) {
                match event.change {
                    NextHopChange::Installed => self.0.fetch_add(1, Ordering::SeqCst),
                    NextHopChange::Removed => self.1.fetch_add(1, Ordering::SeqCst),
                };
            }
        }

        let (_, gateway) = gateway();
        let recorder = Arc::new(Recorder(AtomicUsize::new(0), AtomicUsize::new(0)));
        gateway.register_observer(recorder.clone());

        let rif = RouterInterfaceHandle::from_raw(7).unwrap();
        let cpu = crate::types::PortHandle::from_raw(9).unwrap();
        let subnet = route_key("10.0.0.0/24");
        let host = route_key("10.0.0.1/32");

        gateway
            .create_route(&subnet, RouteNextHop::RouterInterface(rif))
            .unwrap();
        // CPU-bound host routes are not next-hop events
        gateway
            .create_route(&host, RouteNextHop::CpuPort(cpu))
            .unwrap();
        gateway
            .remove_route(&subnet, RouteNextHop::RouterInterface(rif))
            .unwrap();

        assert_eq!(recorder.0.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.1.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_error_propagates() {
        let (driver, gateway) = gateway();
        driver.inject_failure(HalError::TransientBusy);

        let rif = RouterInterfaceHandle::from_raw(7).unwrap();
        let err = gateway
            .create_route(&route_key("10.0.0.0/24"), RouteNextHop::RouterInterface(rif))
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(gateway.counters().used(ResourceKind::Ipv4Route), 0);
    }
}
