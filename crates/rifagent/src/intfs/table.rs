//! RIF lifecycle bookkeeping.

use super::types::RifEntry;
use crate::ports::Port;
use nos_hal::{HalError, HalGateway, HalResult, RifSpec, VrfHandle};
use nos_types::MacAddress;
use std::collections::HashMap;
use tracing::{debug, info};

/// Outcome of a remove attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RifRemoval {
    /// The RIF was removed and its entry erased.
    Removed,
    /// The RIF is still referenced; nothing was changed.
    Busy,
}

/// Interface name -> [`RifEntry`]; owns the RIF lifecycle against the HAL.
///
/// Loopback interfaces get a sentinel entry through
/// [`RifTable::insert_sentinel`]: no hardware object, no address tracking.
#[derive(Debug, Default)]
pub struct RifTable {
    entries: HashMap<String, RifEntry>,
}

impl RifTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, alias: &str) -> Option<&RifEntry> {
        self.entries.get(alias)
    }

    pub fn get_mut(&mut self, alias: &str) -> Option<&mut RifEntry> {
        self.entries.get_mut(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RifEntry)> {
        self.entries.iter()
    }

    /// Ensures a sentinel entry for a loopback interface.
    pub fn insert_sentinel(&mut self, alias: &str, vrf: VrfHandle) {
        self.entries
            .entry(alias.to_string())
            .or_insert_with(|| RifEntry::new(vrf, 0));
    }

    /// Drops a loopback sentinel entry.
    pub fn remove_sentinel(&mut self, alias: &str) -> Option<RifEntry> {
        self.entries.remove(alias)
    }

    /// Ensures `port` has a RIF in `vrf`.
    ///
    /// No-op if the port already carries one. On success the handle and VRF
    /// are written into `port` (the caller publishes the descriptor back to
    /// the directory) and a fresh entry is inserted.
    pub fn ensure_rif(
        &mut self,
        port: &mut Port,
        vrf: VrfHandle,
        src_mac: MacAddress,
        hal: &HalGateway,
    ) -> HalResult<()> {
        if port.rif.is_some() {
            debug!(alias = %port.alias, "router interface already exists");
            return Ok(());
        }

        let binding = port
            .rif_binding()
            .ok_or_else(|| HalError::fatal(format!("port kind {} cannot carry a RIF", port.kind)))?;

        let rif = hal.create_rif(&RifSpec {
            binding,
            vrf,
            src_mac,
            mtu: port.mtu,
        })?;

        port.rif = Some(rif);
        port.vrf = Some(vrf);
        self.entries
            .entry(port.alias.clone())
            .or_insert_with(|| RifEntry::new(vrf, port.mtu));

        info!(alias = %port.alias, %rif, mtu = port.mtu, "router interface ready");
        Ok(())
    }

    /// Removes `port`'s RIF unless it is still referenced.
    ///
    /// On [`RifRemoval::Removed`] the handle and VRF are cleared from `port`
    /// and the entry erased; on [`RifRemoval::Busy`] nothing changes and the
    /// caller retries once the reference count drops.
    pub fn try_remove_rif(&mut self, port: &mut Port, hal: &HalGateway) -> HalResult<RifRemoval> {
        if let Some(entry) = self.entries.get(&port.alias) {
            if entry.is_referenced() {
                info!(alias = %port.alias, ref_count = entry.ref_count,
                      "router interface still referenced");
                return Ok(RifRemoval::Busy);
            }
        }

        if let Some(rif) = port.rif {
            hal.remove_rif(rif)?;
        }

        port.rif = None;
        port.vrf = None;
        self.entries.remove(&port.alias);

        info!(alias = %port.alias, "router interface removed");
        Ok(RifRemoval::Removed)
    }

    /// Pushes a changed port MTU down to the RIF.
    pub fn refresh_mtu(&mut self, port: &Port, hal: &HalGateway) -> HalResult<()> {
        let Some(entry) = self.entries.get_mut(&port.alias) else {
            return Ok(());
        };
        let Some(rif) = port.rif else {
            return Ok(());
        };

        if entry.mtu != port.mtu {
            hal.set_rif_mtu(rif, port.mtu)?;
            entry.mtu = port.mtu;
        }
        Ok(())
    }

    /// Increments an interface's reference count.
    pub fn increase_ref(&mut self, alias: &str) -> Option<u32> {
        let count = self.entries.get_mut(alias)?.add_ref();
        debug!(alias, ref_count = count, "router interface ref count increased");
        Some(count)
    }

    /// Decrements an interface's reference count.
    pub fn decrease_ref(&mut self, alias: &str) -> Option<u32> {
        let count = self.entries.get_mut(alias)?.remove_ref()?;
        debug!(alias, ref_count = count, "router interface ref count decreased");
        Some(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nos_hal::{MockSwitchDriver, PortHandle};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn setup() -> (Arc<MockSwitchDriver>, HalGateway, RifTable, Port) {
        let driver = Arc::new(MockSwitchDriver::new());
        let hal = HalGateway::new(driver.clone());
        let table = RifTable::new();
        let port = Port::phy("Ethernet0", PortHandle::from_raw(1).unwrap(), 9100);
        (driver, hal, table, port)
    }

    fn vrf() -> VrfHandle {
        VrfHandle::from_raw(0x30).unwrap()
    }

    fn mac() -> MacAddress {
        "00:11:22:33:44:55".parse().unwrap()
    }

    #[test]
    fn test_ensure_rif_creates_once() {
        let (driver, hal, mut table, mut port) = setup();

        table.ensure_rif(&mut port, vrf(), mac(), &hal).unwrap();
        assert!(port.rif.is_some());
        assert_eq!(port.vrf, Some(vrf()));
        assert_eq!(driver.rif_count(), 1);
        assert_eq!(table.get("Ethernet0").unwrap().ref_count, 0);

        // Second call is a no-op
        table.ensure_rif(&mut port, vrf(), mac(), &hal).unwrap();
        assert_eq!(driver.rif_count(), 1);
    }

    #[test]
    fn test_remove_busy_when_referenced() {
        let (driver, hal, mut table, mut port) = setup();
        table.ensure_rif(&mut port, vrf(), mac(), &hal).unwrap();
        table.increase_ref("Ethernet0");

        assert_eq!(
            table.try_remove_rif(&mut port, &hal).unwrap(),
            RifRemoval::Busy
        );
        assert!(port.rif.is_some());
        assert_eq!(driver.rif_count(), 1);

        table.decrease_ref("Ethernet0");
        assert_eq!(
            table.try_remove_rif(&mut port, &hal).unwrap(),
            RifRemoval::Removed
        );
        assert!(port.rif.is_none());
        assert!(!table.contains("Ethernet0"));
        assert_eq!(driver.rif_count(), 0);
    }

    #[test]
    fn test_refresh_mtu() {
        let (driver, hal, mut table, mut port) = setup();
        table.ensure_rif(&mut port, vrf(), mac(), &hal).unwrap();
        let rif = port.rif.unwrap();

        port.mtu = 1500;
        table.refresh_mtu(&port, &hal).unwrap();
        assert_eq!(driver.rif_spec(rif).unwrap().mtu, 1500);
        assert_eq!(table.get("Ethernet0").unwrap().mtu, 1500);

        // Unchanged MTU makes no driver call
        driver.clear_history();
        table.refresh_mtu(&port, &hal).unwrap();
        assert!(driver.history().is_empty());
    }

    #[test]
    fn test_loopback_sentinel_has_no_hw_object() {
        let (driver, hal, mut table, _) = setup();
        let _ = hal;

        table.insert_sentinel("lo", vrf());
        assert!(table.contains("lo"));
        assert_eq!(table.get("lo").unwrap().ref_count, 0);
        assert_eq!(driver.rif_count(), 0);
    }

    #[test]
    fn test_decrease_ref_underflow_is_none() {
        let (_, _, mut table, _) = setup();
        table.insert_sentinel("lo", vrf());
        assert_eq!(table.decrease_ref("lo"), None);
        assert_eq!(table.decrease_ref("unknown"), None);
    }
}
