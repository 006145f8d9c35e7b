//! The interface reconciler.

use super::routes::{InsertOutcome, IntfRouteIndex, WithdrawEffect};
use super::table::{RifRemoval, RifTable};
use super::types::{IntfRoute, RifEntry, RouteKind};
use crate::ports::{Port, PortDirectory};
use crate::vrf::VrfDirectory;
use async_trait::async_trait;
use nos_hal::{HalError, HalGateway, PortHandle, RouteKey, RouteNextHop, RouterInterfaceHandle, VrfHandle};
use nos_orch_common::{
    Consumer, ConsumerConfig, KeyOpFieldsValues, Operation, Orch, TaskError, TaskResult,
    TaskStatus,
};
use nos_types::{IpPrefix, MacAddress, PortKind};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Aliases whose addresses are never reconciled.
const IGNORED_ALIASES: [&str; 3] = ["eth0", "docker0", "Bridge"];

/// The loopback alias, handled without a port-directory lookup.
const LOOPBACK_ALIAS: &str = "lo";

/// Largest IPv4 mask length that still has a usable directed broadcast.
const BCAST_MAX_MASK_LEN: u8 = 30;

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct IntfsOrchConfig {
    /// Source MAC for created router interfaces.
    pub router_mac: MacAddress,
    /// Bus table the consumer reads.
    pub table_name: String,
    /// Daemon scheduling priority.
    pub priority: i32,
}

impl IntfsOrchConfig {
    pub fn new(router_mac: MacAddress) -> Self {
        Self {
            router_mac,
            table_name: "INTF_TABLE".to_string(),
            priority: 5,
        }
    }
}

/// Reconciler statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntfsOrchStats {
    pub rifs_created: u64,
    pub rifs_removed: u64,
    pub routes_installed: u64,
    pub routes_removed: u64,
    pub neighbors_installed: u64,
    pub neighbors_removed: u64,
    pub events_deferred: u64,
    pub events_failed: u64,
}

/// Reconciles desired L3 interface configuration against the forwarding
/// plane.
///
/// Single-threaded: this is the sole mutator of the RIF table and the
/// interface-route index. The port and VRF directories are read-only here
/// except for the RIF handle write-back after a create or remove.
pub struct IntfsOrch {
    config: IntfsOrchConfig,
    consumer: Consumer,
    ports: Arc<RwLock<PortDirectory>>,
    vrfs: Arc<RwLock<VrfDirectory>>,
    hal: Arc<HalGateway>,
    rif_table: RifTable,
    intf_routes: IntfRouteIndex,
    /// Promoted entries whose install failed transiently; retried each
    /// drain cycle while they remain the head.
    pending_resurrections: Vec<IntfRoute>,
    stats: IntfsOrchStats,
}

impl IntfsOrch {
    pub fn new(
        config: IntfsOrchConfig,
        ports: Arc<RwLock<PortDirectory>>,
        vrfs: Arc<RwLock<VrfDirectory>>,
        hal: Arc<HalGateway>,
    ) -> Self {
        let consumer = Consumer::new(
            ConsumerConfig::new(config.table_name.clone()).with_priority(config.priority),
        );
        Self {
            config,
            consumer,
            ports,
            vrfs,
            hal,
            rif_table: RifTable::new(),
            intf_routes: IntfRouteIndex::new(),
            pending_resurrections: Vec::new(),
            stats: IntfsOrchStats::default(),
        }
    }

    /// Feeds bus records into the pending map.
    pub fn enqueue(&mut self, entries: Vec<KeyOpFieldsValues>) {
        self.consumer.add_to_sync(entries);
    }

    /// Returns the number of pending events.
    pub fn pending_count(&self) -> usize {
        self.consumer.pending_count()
    }

    /// Returns the RIF state for an interface.
    pub fn rif_entry(&self, alias: &str) -> Option<&RifEntry> {
        self.rif_table.get(alias)
    }

    /// Returns the RIF handle bound to an interface.
    pub fn router_intf_handle(&self, alias: &str) -> Option<RouterInterfaceHandle> {
        self.ports.read().get_port(alias).and_then(|p| p.rif)
    }

    /// External hold on an interface (next-hop resolvers).
    pub fn increase_router_intf_ref(&mut self, alias: &str) -> Option<u32> {
        self.rif_table.increase_ref(alias)
    }

    /// Releases an external hold.
    pub fn decrease_router_intf_ref(&mut self, alias: &str) -> Option<u32> {
        self.rif_table.decrease_ref(alias)
    }

    /// Returns the overlap index.
    pub fn route_index(&self) -> &IntfRouteIndex {
        &self.intf_routes
    }

    /// Returns the RIF table.
    pub fn rif_table(&self) -> &RifTable {
        &self.rif_table
    }

    pub fn stats(&self) -> &IntfsOrchStats {
        &self.stats
    }

    /// One drain cycle: retries deferred resurrections, then processes
    /// every pending event. Events whose status is retryable survive into
    /// the next cycle.
    pub fn drain_pending(&mut self) {
        if !self.ports.read().is_init_done() {
            debug!("ports not ready, leaving events pending");
            return;
        }

        self.retry_resurrections();

        let entries = self.consumer.drain();
        let mut deferred = Vec::new();

        for entry in entries {
            match self.process_entry(&entry) {
                Ok(()) => {}
                Err(e) => match e.to_status() {
                    TaskStatus::Duplicated => {
                        info!(key = %entry.key, reason = %e, "duplicate event consumed");
                    }
                    TaskStatus::WaitingForDependency => {
                        info!(key = %entry.key, reason = %e, "event deferred");
                        self.stats.events_deferred += 1;
                        deferred.push(entry);
                    }
                    TaskStatus::NeedRetry => {
                        warn!(key = %entry.key, reason = %e, "event left pending for retry");
                        self.stats.events_deferred += 1;
                        deferred.push(entry);
                    }
                    TaskStatus::InvalidEntry => {
                        error!(key = %entry.key, reason = %e, "malformed event consumed");
                        self.stats.events_failed += 1;
                    }
                    TaskStatus::Failed | TaskStatus::Success => {
                        error!(key = %entry.key, reason = %e, "event failed, consuming");
                        self.stats.events_failed += 1;
                    }
                },
            }
        }

        // push_front in reverse keeps same-key ordering intact
        for entry in deferred.into_iter().rev() {
            self.consumer.retry(entry);
        }
    }

    fn process_entry(&mut self, entry: &KeyOpFieldsValues) -> TaskResult<()> {
        let (alias, prefix) = Self::parse_key(&entry.key)?;

        if IGNORED_ALIASES.contains(&alias.as_str()) {
            debug!(alias, "ignored alias");
            return Ok(());
        }

        if let Some(scope) = entry.get_field("scope") {
            // Scope is recognized but does not gate anything.
            debug!(alias, scope, "address scope");
        }

        match entry.op {
            Operation::Set => {
                let vrf = self.resolve_vrf(entry)?;
                self.handle_set(&alias, prefix, vrf)
            }
            Operation::Del => self.handle_delete(&alias, prefix),
        }
    }

    /// Splits `"<iface>[:<prefix>]"`. Everything after the first ':' is the
    /// prefix, so colon-hex IPv6 forms survive.
    fn parse_key(key: &str) -> TaskResult<(String, Option<IpPrefix>)> {
        let (alias, prefix_str) = match key.split_once(':') {
            Some((alias, rest)) => (alias, Some(rest)),
            None => (key, None),
        };

        let valid_alias = alias
            .chars()
            .next()
            .map(|c| c.is_ascii_alphabetic())
            .unwrap_or(false)
            && alias
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !valid_alias {
            return Err(TaskError::invalid_entry(format!("bad interface name in key {}", key)));
        }

        let prefix = match prefix_str {
            Some(s) => Some(
                s.parse::<IpPrefix>()
                    .map_err(|e| TaskError::invalid_entry(format!("bad prefix in key {}: {}", key, e)))?,
            ),
            None => None,
        };

        Ok((alias.to_string(), prefix))
    }

    fn resolve_vrf(&self, entry: &KeyOpFieldsValues) -> TaskResult<VrfHandle> {
        let vrf_name = entry.get_field("vrf_name");
        let vnet_name = entry.get_field("vnet_name");

        match (vrf_name, vnet_name) {
            (Some(_), Some(_)) => Err(TaskError::invalid_entry(
                "vrf_name and vnet_name are mutually exclusive",
            )),
            (None, Some(vnet)) => self
                .vrfs
                .read()
                .get_vnet(vnet)
                .ok_or_else(|| TaskError::waiting_for(format!("VNET|{}", vnet))),
            (Some(vrf), None) => self
                .vrfs
                .read()
                .get_vrf(vrf)
                .ok_or_else(|| TaskError::waiting_for(format!("VRF|{}", vrf))),
            (None, None) => Ok(self.vrfs.read().default_vrf()),
        }
    }

    fn handle_set(
        &mut self,
        alias: &str,
        prefix: Option<IpPrefix>,
        vrf: VrfHandle,
    ) -> TaskResult<()> {
        let mut port = if alias == LOOPBACK_ALIAS {
            Port::loopback(alias)
        } else {
            self.ports
                .read()
                .get_port(alias)
                .ok_or_else(|| TaskError::waiting_for(format!("PORT|{}", alias)))?
        };

        if port.kind.is_loopback() {
            self.rif_table.insert_sentinel(alias, vrf);
        } else if port.rif.is_none() {
            self.rif_table
                .ensure_rif(&mut port, vrf, self.config.router_mac, &self.hal)
                .map_err(Self::map_hal_error)?;
            self.ports.write().set_port(port.clone());
            self.stats.rifs_created += 1;
        } else {
            if let Some(entry) = self.rif_table.get(alias) {
                if entry.vrf != vrf {
                    warn!(alias, bound = %entry.vrf, requested = %vrf,
                          "interface already bound to a different VRF, keeping binding");
                }
            }
            self.rif_table
                .refresh_mtu(&port, &self.hal)
                .map_err(Self::map_hal_error)?;
        }

        let Some(prefix) = prefix else {
            return Ok(());
        };

        let is_loopback = port.kind.is_loopback();
        if !is_loopback {
            if let Some(entry) = self.rif_table.get(alias) {
                if entry.addresses.contains(&prefix) {
                    return Err(TaskError::duplicated(format!("{} on {}", prefix, alias)));
                }
                // Legacy two-stage address set: an overlapping (but not
                // identical) address waits until the old one is withdrawn.
                if let Some(existing) = entry.addresses.iter().find(|a| {
                    **a != prefix
                        && (a.contains(prefix.address()) || prefix.contains(a.address()))
                }) {
                    return Err(TaskError::waiting_for(format!(
                        "withdrawal of {} overlapping {} on {}",
                        existing, prefix, alias
                    )));
                }
            }
        }

        let effective_vrf = self.rif_table.get(alias).map(|e| e.vrf).unwrap_or(vrf);
        let derived = Self::derived_routes(&port, &prefix);

        for route in derived {
            match self.intf_routes.insert(route.clone()) {
                InsertOutcome::Fresh => {
                    if let Err(e) = self.install_route(&route, &port, effective_vrf) {
                        // Failed installs leave no trace in the index
                        self.intf_routes.withdraw(&route.prefix, &route.iface);
                        return Err(e);
                    }
                }
                InsertOutcome::Shadowed => {
                    info!(route = %route, "route shadowed by an active entry");
                }
                InsertOutcome::Duplicate => {}
            }
        }

        if !is_loopback {
            if let Some(entry) = self.rif_table.get_mut(alias) {
                entry.addresses.insert(prefix);
            }
        }

        Ok(())
    }

    fn handle_delete(&mut self, alias: &str, prefix: Option<IpPrefix>) -> TaskResult<()> {
        let port = if alias == LOOPBACK_ALIAS {
            Port::loopback(alias)
        } else {
            match self.ports.read().get_port(alias) {
                Some(port) => port,
                None => {
                    info!(alias, "port gone before address delete, nothing to do");
                    return Ok(());
                }
            }
        };

        let Some(prefix) = prefix else {
            return self.remove_intf(alias, port);
        };

        let is_loopback = port.kind.is_loopback();
        if !is_loopback && !self.rif_table.contains(alias) {
            debug!(alias, %prefix, "no router interface state, nothing to do");
            return Ok(());
        }

        let effective_vrf = self
            .rif_table
            .get(alias)
            .map(|e| e.vrf)
            .unwrap_or_else(|| self.vrfs.read().default_vrf());

        // Withdraw in the reverse of the insertion order. A DEL retried
        // after a busy RIF finds the address already untracked and falls
        // through to the removal below.
        let tracked = is_loopback
            || self
                .rif_table
                .get(alias)
                .map(|e| e.addresses.contains(&prefix))
                .unwrap_or(false);
        if tracked {
            let derived = Self::derived_routes(&port, &prefix);
            for route in derived.iter().rev() {
                self.withdraw_route(route, &port, effective_vrf)?;
            }
        }

        if !is_loopback {
            if let Some(entry) = self.rif_table.get_mut(alias) {
                entry.addresses.remove(&prefix);
                if !entry.addresses.is_empty() {
                    return Ok(());
                }
            }

            let mut port = port;
            match self
                .rif_table
                .try_remove_rif(&mut port, &self.hal)
                .map_err(Self::map_hal_error)?
            {
                RifRemoval::Busy => {
                    return Err(TaskError::need_retry(format!(
                        "router interface {} still referenced",
                        alias
                    )));
                }
                RifRemoval::Removed => {
                    self.ports.write().set_port(port);
                    self.stats.rifs_removed += 1;
                }
            }
        }

        Ok(())
    }

    /// Interface-level delete (no prefix in the key).
    fn remove_intf(&mut self, alias: &str, port: Port) -> TaskResult<()> {
        if port.kind.is_loopback() {
            self.rif_table.remove_sentinel(alias);
            return Ok(());
        }

        let Some(entry) = self.rif_table.get(alias) else {
            return Ok(());
        };
        if !entry.addresses.is_empty() {
            info!(alias, remaining = entry.addresses.len(),
                  "interface delete with addresses still assigned, nothing to do");
            return Ok(());
        }

        let mut port = port;
        match self
            .rif_table
            .try_remove_rif(&mut port, &self.hal)
            .map_err(Self::map_hal_error)?
        {
            RifRemoval::Busy => Err(TaskError::need_retry(format!(
                "router interface {} still referenced",
                alias
            ))),
            RifRemoval::Removed => {
                self.ports.write().set_port(port);
                self.stats.rifs_removed += 1;
                Ok(())
            }
        }
    }

    /// Routes implied by an address, in install order. Withdrawal walks the
    /// same list backwards.
    fn derived_routes(port: &Port, prefix: &IpPrefix) -> Vec<IntfRoute> {
        let mut routes = Vec::with_capacity(3);

        if !port.kind.is_loopback() && !prefix.is_host_route() {
            routes.push(IntfRoute::new(
                prefix.subnet(),
                port.alias.as_str(),
                RouteKind::Subnet,
            ));
        }

        routes.push(IntfRoute::new(
            prefix.host_prefix(),
            port.alias.as_str(),
            RouteKind::Ip2Me,
        ));

        if port.kind == PortKind::Vlan
            && prefix.is_ipv4()
            && prefix.prefix_len() <= BCAST_MAX_MASK_LEN
        {
            if let Some(bcast) = prefix.broadcast_address() {
                if let Ok(bcast_prefix) = IpPrefix::new(bcast.into(), 32) {
                    routes.push(IntfRoute::new(
                        bcast_prefix,
                        port.alias.as_str(),
                        RouteKind::Bcast,
                    ));
                }
            }
        }

        routes
    }

    fn install_route(&mut self, route: &IntfRoute, port: &Port, vrf: VrfHandle) -> TaskResult<()> {
        let hal = self.hal.clone();
        let key = RouteKey::new(vrf, route.prefix);

        match route.kind {
            RouteKind::Subnet => {
                let rif = Self::rif_of(port)?;
                hal.create_route(&key, RouteNextHop::RouterInterface(rif))
                    .map_err(Self::map_hal_error)?;
                self.rif_table.increase_ref(&route.iface);
                self.stats.routes_installed += 1;
            }
            RouteKind::Ip2Me => {
                let cpu = self
                    .ports
                    .read()
                    .cpu_port()
                    .ok_or_else(|| TaskError::waiting_for("PORT|cpu"))?;
                hal.create_route(&key, RouteNextHop::CpuPort(cpu.port_handle))
                    .map_err(Self::map_hal_error)?;
                self.stats.routes_installed += 1;
            }
            RouteKind::Bcast => {
                let rif = Self::rif_of(port)?;
                let ip = *route
                    .prefix
                    .address()
                    .as_ipv4()
                    .ok_or_else(|| TaskError::invalid_entry("broadcast entry for IPv6 prefix"))?;
                hal.create_bcast_neighbor(rif, ip)
                    .map_err(Self::map_hal_error)?;
                self.stats.neighbors_installed += 1;
            }
        }

        Ok(())
    }

    fn uninstall_route(&mut self, route: &IntfRoute, port: &Port, vrf: VrfHandle) -> TaskResult<()> {
        let hal = self.hal.clone();
        let key = RouteKey::new(vrf, route.prefix);

        match route.kind {
            RouteKind::Subnet => {
                let rif = Self::rif_of(port)?;
                hal.remove_route(&key, RouteNextHop::RouterInterface(rif))
                    .map_err(Self::map_hal_error)?;
                self.rif_table.decrease_ref(&route.iface);
                self.stats.routes_removed += 1;
            }
            RouteKind::Ip2Me => {
                let cpu_handle = self
                    .ports
                    .read()
                    .cpu_port()
                    .map(|p| p.port_handle)
                    .unwrap_or(PortHandle::NULL);
                hal.remove_route(&key, RouteNextHop::CpuPort(cpu_handle))
                    .map_err(Self::map_hal_error)?;
                self.stats.routes_removed += 1;
            }
            RouteKind::Bcast => {
                let rif = Self::rif_of(port)?;
                let ip = *route
                    .prefix
                    .address()
                    .as_ipv4()
                    .ok_or_else(|| TaskError::invalid_entry("broadcast entry for IPv6 prefix"))?;
                hal.remove_bcast_neighbor(rif, ip)
                    .map_err(Self::map_hal_error)?;
                self.stats.neighbors_removed += 1;
            }
        }

        Ok(())
    }

    /// Withdraws one derived route, uninstalling the head and promoting the
    /// oldest shadow when the withdrawn entry was active.
    fn withdraw_route(&mut self, route: &IntfRoute, port: &Port, vrf: VrfHandle) -> TaskResult<()> {
        match self.intf_routes.withdraw(&route.prefix, &route.iface) {
            WithdrawEffect::NotFound => Ok(()),
            WithdrawEffect::ShadowRemoved => {
                info!(route = %route, "shadow entry dropped");
                Ok(())
            }
            WithdrawEffect::HeadChanged { removed, promoted } => {
                if let Err(e) = self.uninstall_route(&removed, port, vrf) {
                    // Hardware still holds the route; undo the withdraw so
                    // state and hardware agree for the retry.
                    self.intf_routes.reinstate_head(removed);
                    return Err(e);
                }

                if let Some(next) = promoted {
                    info!(route = %next, "resurrecting shadowed interface route");
                    if let Err(e) = self.resurrect_route(&next) {
                        warn!(route = %next, reason = %e, "resurrection deferred");
                        self.pending_resurrections.push(next);
                    }
                }
                Ok(())
            }
        }
    }

    /// Installs a freshly promoted entry using its own interface's context.
    fn resurrect_route(&mut self, route: &IntfRoute) -> TaskResult<()> {
        let port = if route.iface == LOOPBACK_ALIAS {
            Port::loopback(LOOPBACK_ALIAS)
        } else {
            match self.ports.read().get_port(&route.iface) {
                Some(port) => port,
                None => {
                    warn!(route = %route, "missing port for resurrected route, skipping");
                    return Ok(());
                }
            }
        };

        let vrf = self
            .rif_table
            .get(&route.iface)
            .map(|e| e.vrf)
            .unwrap_or_else(|| self.vrfs.read().default_vrf());

        self.install_route(route, &port, vrf)
    }

    fn retry_resurrections(&mut self) {
        if self.pending_resurrections.is_empty() {
            return;
        }

        let pending = std::mem::take(&mut self.pending_resurrections);
        for route in pending {
            // A shadow withdrawn while waiting no longer needs installing
            if !self.intf_routes.is_head(&route.prefix, &route.iface) {
                continue;
            }
            if let Err(e) = self.resurrect_route(&route) {
                warn!(route = %route, reason = %e, "resurrection still deferred");
                self.pending_resurrections.push(route);
            }
        }
    }

    fn rif_of(port: &Port) -> TaskResult<RouterInterfaceHandle> {
        port.rif
            .ok_or_else(|| TaskError::hardware(format!("no router interface on {}", port.alias)))
    }

    fn map_hal_error(e: HalError) -> TaskError {
        if e.is_retryable() {
            TaskError::need_retry(e.to_string())
        } else {
            TaskError::hardware(e.to_string())
        }
    }
}

#[async_trait]
impl Orch for IntfsOrch {
    fn name(&self) -> &str {
        "IntfsOrch"
    }

    async fn do_task(&mut self) {
        self.drain_pending();
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn has_pending_tasks(&self) -> bool {
        self.consumer.has_pending() || !self.pending_resurrections.is_empty()
    }

    fn dump_pending_tasks(&self) -> Vec<String> {
        self.consumer.dump()
    }
}
