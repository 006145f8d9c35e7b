//! Lookup view over the port manager's state.

use super::types::Port;
use std::collections::HashMap;

/// Directory of known ports, keyed by alias.
///
/// The external port manager owns membership and port attributes; the
/// reconciler reads descriptors and, after a successful RIF create or
/// remove, writes the updated descriptor back with [`PortDirectory::set_port`].
/// Consumers must defer work for aliases that are not present yet.
#[derive(Debug, Default)]
pub struct PortDirectory {
    ports: HashMap<String, Port>,
    cpu_port: Option<Port>,
    init_done: bool,
}

impl PortDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the descriptor for `alias`, if known.
    pub fn get_port(&self, alias: &str) -> Option<Port> {
        self.ports.get(alias).cloned()
    }

    /// Returns true if `alias` is known.
    pub fn has_port(&self, alias: &str) -> bool {
        self.ports.contains_key(alias)
    }

    /// Inserts or replaces a descriptor.
    pub fn set_port(&mut self, port: Port) {
        self.ports.insert(port.alias.clone(), port);
    }

    /// Removes a descriptor.
    pub fn remove_port(&mut self, alias: &str) -> Option<Port> {
        self.ports.remove(alias)
    }

    /// Returns the CPU port, if registered.
    pub fn cpu_port(&self) -> Option<Port> {
        self.cpu_port.clone()
    }

    /// Registers the CPU port.
    pub fn set_cpu_port(&mut self, port: Port) {
        self.cpu_port = Some(port);
    }

    /// Returns true once the port manager has published every port.
    pub fn is_init_done(&self) -> bool {
        self.init_done
    }

    /// Marks initial port publication as complete.
    pub fn set_init_done(&mut self, done: bool) {
        self.init_done = done;
    }

    /// Returns the number of known ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Returns true if no ports are known.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
