//! End-to-end reconciler scenarios against the in-memory driver.

use nos_hal::{
    HalError, HalGateway, LagHandle, MockOp, MockSwitchDriver, PortHandle, RouteNextHop,
    VlanHandle, VrfHandle,
};
use nos_orch_common::KeyOpFieldsValues;
use nos_types::{IpPrefix, MacAddress};
use parking_lot::RwLock;
use pretty_assertions::assert_eq;
use rifagent::intfs::{IntfsOrch, IntfsOrchConfig, RouteKind};
use rifagent::ports::{Port, PortDirectory};
use rifagent::vrf::VrfDirectory;
use std::collections::HashMap;
use std::sync::Arc;

const DEFAULT_VRF_RAW: u64 = 0x30;
const CPU_PORT_RAW: u64 = 0xc0;

struct Fixture {
    driver: Arc<MockSwitchDriver>,
    orch: IntfsOrch,
    ports: Arc<RwLock<PortDirectory>>,
}

impl Fixture {
    fn new() -> Self {
        let driver = Arc::new(MockSwitchDriver::new());
        let hal = Arc::new(HalGateway::new(driver.clone()));
        let ports = Arc::new(RwLock::new(PortDirectory::new()));
        let vrfs = Arc::new(RwLock::new(VrfDirectory::new(default_vrf())));

        {
            let mut dir = ports.write();
            dir.set_port(Port::phy("Ethernet0", PortHandle::from_raw(1).unwrap(), 9100));
            dir.set_port(Port::vlan("Vlan100", VlanHandle::from_raw(2).unwrap(), 9100));
            dir.set_port(Port::lag("PortChannel1", LagHandle::from_raw(3).unwrap(), 9100));
            dir.set_cpu_port(Port::cpu("CPU", PortHandle::from_raw(CPU_PORT_RAW).unwrap()));
            dir.set_init_done(true);
        }

        let config = IntfsOrchConfig::new("52:54:00:12:34:56".parse::<MacAddress>().unwrap());
        let orch = IntfsOrch::new(config, ports.clone(), vrfs, hal);

        Self {
            driver,
            orch,
            ports,
        }
    }

    fn set(&mut self, key: &str) {
        self.orch.enqueue(vec![KeyOpFieldsValues::set(
            key,
            vec![("scope".to_string(), "global".to_string())],
        )]);
        self.orch.drain_pending();
    }

    fn del(&mut self, key: &str) {
        self.orch.enqueue(vec![KeyOpFieldsValues::del(key)]);
        self.orch.drain_pending();
    }

    fn route(&self, destination: &str) -> Option<RouteNextHop> {
        self.driver.route_to(default_vrf(), destination)
    }

    fn rif_of(&self, alias: &str) -> nos_hal::RouterInterfaceHandle {
        self.orch.router_intf_handle(alias).expect("rif must exist")
    }

    /// Snapshot used by the idempotence and inverse properties.
    fn hal_state(&self) -> (HashMap<String, String>, usize, usize) {
        let routes = self
            .driver
            .routes()
            .into_iter()
            .map(|(k, v)| (format!("{}@{}", k.destination, k.vrf), format!("{:?}", v)))
            .collect();
        (routes, self.driver.rif_count(), self.driver.neighbor_count())
    }

    /// P3: for every overlap list, hardware holds exactly the head.
    fn assert_heads_installed(&self) {
        for (key, list) in self.orch.route_index().iter() {
            let head = list.first().expect("lists are never empty");
            match head.kind {
                RouteKind::Subnet | RouteKind::Ip2Me => {
                    assert!(
                        self.route(key).is_some(),
                        "head of {} not installed in hardware",
                        key
                    );
                }
                RouteKind::Bcast => {
                    let rif = self.rif_of(&head.iface);
                    let ip = *head.prefix.address().as_ipv4().unwrap();
                    assert!(
                        self.driver.neighbor(rif, ip).is_some(),
                        "broadcast head of {} not installed",
                        key
                    );
                }
            }
        }
    }

    /// P5: per-interface ref count equals the number of subnet heads.
    fn assert_ref_counts_match_heads(&self) {
        let mut heads: HashMap<String, u32> = HashMap::new();
        for (_, list) in self.orch.route_index().iter() {
            if let Some(head) = list.first() {
                if head.kind == RouteKind::Subnet {
                    *heads.entry(head.iface.clone()).or_default() += 1;
                }
            }
        }
        for (alias, entry) in self.orch.rif_table().iter() {
            assert_eq!(
                entry.ref_count,
                heads.get(alias).copied().unwrap_or(0),
                "ref count mismatch on {}",
                alias
            );
        }
    }
}

fn default_vrf() -> VrfHandle {
    VrfHandle::from_raw(DEFAULT_VRF_RAW).unwrap()
}

fn cpu_hop() -> RouteNextHop {
    RouteNextHop::CpuPort(PortHandle::from_raw(CPU_PORT_RAW).unwrap())
}

#[test]
fn basic_subnet_and_ip2me() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");

    let rif = fx.rif_of("Ethernet0");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif))
    );
    assert_eq!(fx.route("10.0.0.1/32"), Some(cpu_hop()));
    assert_eq!(fx.driver.route_count(), 2);

    let entry = fx.orch.rif_entry("Ethernet0").unwrap();
    assert_eq!(entry.ref_count, 1);
    assert!(entry.addresses.contains(&"10.0.0.1/24".parse().unwrap()));

    // HAL call order: RIF first, then subnet, then IP2Me
    let history = fx.driver.history();
    assert!(matches!(history[0], MockOp::CreateRif(_)));
    assert!(matches!(
        &history[1],
        MockOp::CreateRoute(key, RouteNextHop::RouterInterface(_))
            if key.destination.to_string() == "10.0.0.0/24"
    ));
    assert!(matches!(
        &history[2],
        MockOp::CreateRoute(key, RouteNextHop::CpuPort(_))
            if key.destination.to_string() == "10.0.0.1/32"
    ));
}

#[test]
fn full_host_address_skips_subnet_route() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.5/32");

    assert_eq!(fx.driver.rif_count(), 1);
    assert_eq!(fx.driver.route_count(), 1);
    assert_eq!(fx.route("10.0.0.5/32"), Some(cpu_hop()));
    assert_eq!(fx.orch.rif_entry("Ethernet0").unwrap().ref_count, 0);
}

#[test]
fn vlan_ipv4_gets_directed_broadcast() {
    let mut fx = Fixture::new();
    fx.set("Vlan100:192.168.1.1/24");

    let rif = fx.rif_of("Vlan100");
    assert_eq!(
        fx.driver.neighbor(rif, "192.168.1.255".parse().unwrap()),
        Some(MacAddress::BROADCAST)
    );

    // Mask lengths above /30 have no usable broadcast
    fx.set("Vlan100:192.168.2.1/31");
    assert_eq!(fx.driver.neighbor_count(), 1);

    // IPv6 never gets one
    fx.set("Vlan100:2001:db8::1/64");
    assert_eq!(fx.driver.neighbor_count(), 1);
}

#[test]
fn no_directed_broadcast_off_vlan() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:192.168.1.1/24");
    fx.set("PortChannel1:192.168.3.1/24");
    assert_eq!(fx.driver.neighbor_count(), 0);
}

#[test]
fn overlap_and_resurrection() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    let rif_eth = fx.rif_of("Ethernet0");

    fx.set("Vlan100:10.0.0.2/24");
    // The subnet route still points at the first interface
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_eth))
    );
    assert_eq!(fx.orch.rif_entry("Ethernet0").unwrap().ref_count, 1);
    assert_eq!(fx.orch.rif_entry("Vlan100").unwrap().ref_count, 0);
    fx.assert_heads_installed();
    fx.assert_ref_counts_match_heads();

    fx.del("Ethernet0:10.0.0.1/24");
    // The shadowed entry was resurrected with its own port context
    let rif_vlan = fx.rif_of("Vlan100");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_vlan))
    );
    assert_eq!(fx.route("10.0.0.1/32"), None);
    assert_eq!(fx.route("10.0.0.2/32"), Some(cpu_hop()));
    assert_eq!(fx.orch.rif_entry("Vlan100").unwrap().ref_count, 1);
    // The first interface lost its last address and its RIF
    assert!(fx.orch.rif_entry("Ethernet0").is_none());
    fx.assert_heads_installed();
    fx.assert_ref_counts_match_heads();
}

#[test]
fn fifo_resurrection_across_three_interfaces() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    fx.set("Vlan100:10.0.0.2/24");
    fx.set("PortChannel1:10.0.0.3/24");

    let rif_eth = fx.rif_of("Ethernet0");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_eth))
    );

    // Oldest remaining entry wins, in arrival order
    fx.del("Ethernet0:10.0.0.1/24");
    let rif_vlan = fx.rif_of("Vlan100");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_vlan))
    );

    fx.del("Vlan100:10.0.0.2/24");
    let rif_lag = fx.rif_of("PortChannel1");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_lag))
    );

    fx.del("PortChannel1:10.0.0.3/24");
    assert_eq!(fx.route("10.0.0.0/24"), None);
    assert_eq!(fx.driver.route_count(), 0);
    assert_eq!(fx.driver.rif_count(), 0);
}

#[test]
fn shadow_withdrawal_leaves_active_entry_alone() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    fx.set("Vlan100:10.0.0.2/24");

    let rif_eth = fx.rif_of("Ethernet0");
    fx.driver.clear_history();

    // Withdrawing the shadow touches only its own IP2Me route
    fx.del("Vlan100:10.0.0.2/24");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_eth))
    );
    let subnet_ops = fx
        .driver
        .history()
        .iter()
        .filter(|op| {
            matches!(op, MockOp::CreateRoute(k, _) | MockOp::RemoveRoute(k)
                if k.destination.to_string() == "10.0.0.0/24")
        })
        .count();
    assert_eq!(subnet_ops, 0);
}

#[test]
fn loopback_gets_only_ip2me() {
    let mut fx = Fixture::new();
    fx.set("lo:1.1.1.1/32");

    assert_eq!(fx.driver.rif_count(), 0);
    assert_eq!(fx.driver.route_count(), 1);
    assert_eq!(fx.route("1.1.1.1/32"), Some(cpu_hop()));

    // Wide loopback masks still skip the subnet route
    fx.set("lo:2.2.2.2/24");
    assert_eq!(fx.route("2.2.2.0/24"), None);
    assert_eq!(fx.route("2.2.2.2/32"), Some(cpu_hop()));

    fx.del("lo:1.1.1.1/32");
    fx.del("lo:2.2.2.2/24");
    assert_eq!(fx.driver.route_count(), 0);
}

#[test]
fn busy_rif_defers_removal_until_released() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");

    // External holder (a next-hop resolver) pins the RIF
    fx.orch.increase_router_intf_ref("Ethernet0");

    fx.del("Ethernet0:10.0.0.1/24");
    // Routes are gone but the RIF is pinned and the event stays pending
    assert_eq!(fx.driver.route_count(), 0);
    assert_eq!(fx.driver.rif_count(), 1);
    assert_eq!(fx.orch.pending_count(), 1);
    assert_eq!(fx.orch.rif_entry("Ethernet0").unwrap().ref_count, 1);

    // Release and drain again: removal completes
    fx.orch.decrease_router_intf_ref("Ethernet0");
    fx.orch.drain_pending();
    assert_eq!(fx.driver.rif_count(), 0);
    assert_eq!(fx.orch.pending_count(), 0);
    assert!(fx.orch.rif_entry("Ethernet0").is_none());
}

#[test]
fn replayed_set_is_idempotent() {
    let mut fx = Fixture::new();
    fx.set("Vlan100:192.168.1.1/24");
    let once = fx.hal_state();

    fx.set("Vlan100:192.168.1.1/24");
    assert_eq!(fx.hal_state(), once);
    assert_eq!(fx.orch.rif_entry("Vlan100").unwrap().addresses.len(), 1);

    fx.del("Vlan100:192.168.1.1/24");
    let gone = fx.hal_state();
    fx.del("Vlan100:192.168.1.1/24");
    assert_eq!(fx.hal_state(), gone);
}

#[test]
fn del_is_the_inverse_of_set() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.1.1.1/24");
    let before = fx.hal_state();

    fx.set("Vlan100:10.1.1.2/24");
    fx.del("Vlan100:10.1.1.2/24");

    assert_eq!(fx.hal_state(), before);
    assert!(fx.orch.rif_entry("Vlan100").is_none());
    fx.assert_heads_installed();
    fx.assert_ref_counts_match_heads();
}

#[test]
fn overlapping_lists_hold_one_hardware_entry_each() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    fx.set("Vlan100:10.0.0.2/24");
    fx.set("PortChannel1:10.0.0.3/24");

    fx.assert_heads_installed();
    fx.assert_ref_counts_match_heads();

    // Exactly one subnet route despite three overlapping interfaces
    let subnet: IpPrefix = "10.0.0.0/24".parse().unwrap();
    assert_eq!(fx.orch.route_index().list(&subnet).len(), 3);
    assert!(fx.route("10.0.0.0/24").is_some());
    // 1 subnet + 3 ip2me
    assert_eq!(fx.driver.route_count(), 4);
}

#[test]
fn no_orphan_rif_after_fixpoint() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    fx.set("Vlan100:10.0.0.2/24");
    fx.del("Ethernet0:10.0.0.1/24");
    fx.del("Vlan100:10.0.0.2/24");
    fx.orch.drain_pending();

    for (alias, entry) in fx.orch.rif_table().iter() {
        assert!(
            !entry.addresses.is_empty() || entry.ref_count > 0,
            "orphan RIF state for {}",
            alias
        );
    }
    assert_eq!(fx.driver.rif_count(), 0);
}

#[test]
fn dependency_deferral_then_install() {
    let mut fx = Fixture::new();

    fx.set("Ethernet4:10.4.0.1/24");
    assert_eq!(fx.orch.pending_count(), 1);
    assert!(fx.driver.history().is_empty());

    fx.ports
        .write()
        .set_port(Port::phy("Ethernet4", PortHandle::from_raw(4).unwrap(), 9100));
    fx.orch.drain_pending();

    assert_eq!(fx.orch.pending_count(), 0);
    let rif = fx.rif_of("Ethernet4");
    assert_eq!(
        fx.route("10.4.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif))
    );
}

#[test]
fn transient_rif_create_failure_retries() {
    let mut fx = Fixture::new();
    fx.driver.inject_failure(HalError::TransientBusy);

    fx.set("Ethernet0:10.0.0.1/24");
    assert_eq!(fx.orch.pending_count(), 1);
    assert_eq!(fx.driver.rif_count(), 0);

    // Next drain succeeds with no double bookkeeping
    fx.orch.drain_pending();
    assert_eq!(fx.orch.pending_count(), 0);
    assert_eq!(fx.driver.route_count(), 2);
    assert_eq!(fx.orch.rif_entry("Ethernet0").unwrap().ref_count, 1);
}

#[test]
fn transient_route_failure_rolls_back_index() {
    let mut fx = Fixture::new();
    // RIF exists before the address arrives
    fx.set("Ethernet0");
    fx.driver.inject_failure(HalError::TransientBusy);

    fx.set("Ethernet0:10.0.0.1/24");
    assert_eq!(fx.orch.pending_count(), 1);
    assert_eq!(fx.driver.route_count(), 0);
    assert!(fx.orch.route_index().is_empty());
    assert_eq!(fx.orch.rif_entry("Ethernet0").unwrap().ref_count, 0);

    fx.orch.drain_pending();
    assert_eq!(fx.orch.pending_count(), 0);
    assert_eq!(fx.driver.route_count(), 2);
    fx.assert_ref_counts_match_heads();
}

#[test]
fn fatal_hal_error_consumes_event() {
    let mut fx = Fixture::new();
    fx.driver.inject_failure(HalError::fatal("driver wedged"));

    fx.set("Ethernet0:10.0.0.1/24");
    assert_eq!(fx.orch.pending_count(), 0);
    assert_eq!(fx.orch.stats().events_failed, 1);
    assert_eq!(fx.driver.route_count(), 0);

    // The stream recovers on the next event
    fx.set("Ethernet0:10.0.0.1/24");
    assert_eq!(fx.driver.route_count(), 2);
}

#[test]
fn transient_uninstall_failure_keeps_state_consistent() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");

    // First removal attempt hits a busy driver on the IP2Me withdraw
    fx.driver.inject_failure(HalError::TransientBusy);
    fx.del("Ethernet0:10.0.0.1/24");

    assert_eq!(fx.orch.pending_count(), 1);
    // Hardware still holds both routes and the index still agrees
    assert_eq!(fx.driver.route_count(), 2);
    fx.assert_heads_installed();

    fx.orch.drain_pending();
    assert_eq!(fx.orch.pending_count(), 0);
    assert_eq!(fx.driver.route_count(), 0);
    assert_eq!(fx.driver.rif_count(), 0);
}

#[test]
fn resurrection_failure_is_retried_from_backlog() {
    let mut fx = Fixture::new();
    fx.set("Ethernet0:10.0.0.1/24");
    fx.set("Vlan100:10.0.0.2/24");

    // The DEL makes four driver calls: remove ip2me, remove subnet,
    // install the promoted subnet (resurrection), remove the RIF. Fail
    // only the resurrection install.
    fx.driver.inject_failure_at(2, HalError::TransientBusy);
    fx.del("Ethernet0:10.0.0.1/24");

    // The DEL itself completed; the promotion is an uninstalled head
    assert_eq!(fx.orch.pending_count(), 0);
    assert!(fx.orch.rif_entry("Ethernet0").is_none());
    assert_eq!(fx.route("10.0.0.0/24"), None);

    // The backlog re-runs the install on the next drain cycle
    fx.orch.drain_pending();
    let rif_vlan = fx.rif_of("Vlan100");
    assert_eq!(
        fx.route("10.0.0.0/24"),
        Some(RouteNextHop::RouterInterface(rif_vlan))
    );
    fx.assert_heads_installed();
    fx.assert_ref_counts_match_heads();
}
