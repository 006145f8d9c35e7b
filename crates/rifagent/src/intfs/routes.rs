//! Overlap index of interface routes.

use super::types::IntfRoute;
use nos_types::IpPrefix;
use std::collections::HashMap;
use tracing::warn;

/// Result of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The entry is the new head of a previously empty list; the caller
    /// must install it in hardware.
    Fresh,
    /// The entry is shadowed by an existing head; hardware untouched.
    Shadowed,
    /// An entry with the same `(prefix, iface)` already exists; rejected,
    /// hardware untouched.
    Duplicate,
}

/// Result of a withdraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawEffect {
    /// No entry for this interface under the prefix.
    NotFound,
    /// A shadow entry was dropped; hardware untouched.
    ShadowRemoved,
    /// The head was withdrawn. The caller must uninstall `removed` and, if
    /// present, install `promoted` (the oldest remaining entry).
    HeadChanged {
        removed: IntfRoute,
        promoted: Option<IntfRoute>,
    },
}

/// Interface routes keyed by canonical prefix, with one overlap list per
/// prefix.
///
/// The head of each list is the entry installed in hardware; later arrivals
/// are retained in order. On head withdrawal the oldest remaining entry is
/// promoted, matching the kernel's first-in-keeps-it tie-breaking so that
/// user-observed routing agrees with what the kernel reports.
///
/// Lists are tiny (interfaces sharing one prefix), so a `Vec` with head at
/// index 0 and in-place removal is used.
#[derive(Debug, Default)]
pub struct IntfRouteIndex {
    lists: HashMap<String, Vec<IntfRoute>>,
}

impl IntfRouteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(prefix: &IpPrefix) -> String {
        prefix.to_string()
    }

    /// Appends `entry` to its overlap list.
    pub fn insert(&mut self, entry: IntfRoute) -> InsertOutcome {
        let list = self.lists.entry(Self::key(&entry.prefix)).or_default();

        if list.iter().any(|e| e.iface == entry.iface) {
            warn!(route = %entry, "duplicate interface route, keeping existing entry");
            return InsertOutcome::Duplicate;
        }

        let fresh = list.is_empty();
        list.push(entry);
        if fresh {
            InsertOutcome::Fresh
        } else {
            InsertOutcome::Shadowed
        }
    }

    /// Withdraws the entry for `iface` under `prefix`, if present.
    pub fn withdraw(&mut self, prefix: &IpPrefix, iface: &str) -> WithdrawEffect {
        let key = Self::key(prefix);
        let Some(list) = self.lists.get_mut(&key) else {
            return WithdrawEffect::NotFound;
        };

        let Some(position) = list.iter().position(|e| e.iface == iface) else {
            return WithdrawEffect::NotFound;
        };

        let removed = list.remove(position);
        let effect = if position == 0 {
            WithdrawEffect::HeadChanged {
                removed,
                promoted: list.first().cloned(),
            }
        } else {
            WithdrawEffect::ShadowRemoved
        };

        if list.is_empty() {
            self.lists.remove(&key);
        }
        effect
    }

    /// Puts a head entry back at the front of its list, undoing a withdraw
    /// whose hardware removal did not go through.
    pub fn reinstate_head(&mut self, entry: IntfRoute) {
        self.lists
            .entry(Self::key(&entry.prefix))
            .or_default()
            .insert(0, entry);
    }

    /// Returns the active entry for a prefix.
    pub fn head(&self, prefix: &IpPrefix) -> Option<&IntfRoute> {
        self.lists.get(&Self::key(prefix)).and_then(|l| l.first())
    }

    /// Returns true if `iface` holds the active entry for `prefix`.
    pub fn is_head(&self, prefix: &IpPrefix, iface: &str) -> bool {
        self.head(prefix).map(|e| e.iface == iface).unwrap_or(false)
    }

    /// Returns the overlap list for a prefix.
    pub fn list(&self, prefix: &IpPrefix) -> &[IntfRoute] {
        self.lists
            .get(&Self::key(prefix))
            .map(|l| l.as_slice())
            .unwrap_or(&[])
    }

    /// Iterates over all overlap lists.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<IntfRoute>)> {
        self.lists.iter()
    }

    /// Returns the number of tracked prefixes.
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Returns true if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intfs::types::RouteKind;
    use pretty_assertions::assert_eq;

    fn subnet(prefix: &str, iface: &str) -> IntfRoute {
        IntfRoute::new(prefix.parse().unwrap(), iface, RouteKind::Subnet)
    }

    #[test]
    fn test_first_insert_is_fresh() {
        let mut index = IntfRouteIndex::new();
        assert_eq!(index.insert(subnet("10.0.0.0/24", "Ethernet0")), InsertOutcome::Fresh);
        assert!(index.is_head(&"10.0.0.0/24".parse().unwrap(), "Ethernet0"));
    }

    #[test]
    fn test_second_insert_is_shadowed() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        assert_eq!(
            index.insert(subnet("10.0.0.0/24", "Vlan100")),
            InsertOutcome::Shadowed
        );
        // Head unchanged
        assert!(index.is_head(&"10.0.0.0/24".parse().unwrap(), "Ethernet0"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        assert_eq!(
            index.insert(subnet("10.0.0.0/24", "Ethernet0")),
            InsertOutcome::Duplicate
        );
        assert_eq!(index.list(&"10.0.0.0/24".parse().unwrap()).len(), 1);
    }

    #[test]
    fn test_withdraw_shadow_leaves_head() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        index.insert(subnet("10.0.0.0/24", "Vlan100"));

        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert_eq!(
            index.withdraw(&prefix, "Vlan100"),
            WithdrawEffect::ShadowRemoved
        );
        assert!(index.is_head(&prefix, "Ethernet0"));
    }

    #[test]
    fn test_withdraw_head_promotes_oldest() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        index.insert(subnet("10.0.0.0/24", "Vlan100"));
        index.insert(subnet("10.0.0.0/24", "PortChannel1"));

        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        match index.withdraw(&prefix, "Ethernet0") {
            WithdrawEffect::HeadChanged { removed, promoted } => {
                assert_eq!(removed.iface, "Ethernet0");
                assert_eq!(promoted.unwrap().iface, "Vlan100");
            }
            other => panic!("unexpected effect: {:?}", other),
        }
        assert!(index.is_head(&prefix, "Vlan100"));
    }

    #[test]
    fn test_withdraw_last_erases_key() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));

        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        match index.withdraw(&prefix, "Ethernet0") {
            WithdrawEffect::HeadChanged { promoted, .. } => assert!(promoted.is_none()),
            other => panic!("unexpected effect: {:?}", other),
        }
        assert!(index.is_empty());
    }

    #[test]
    fn test_withdraw_unknown_is_not_found() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));

        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        assert_eq!(index.withdraw(&prefix, "Vlan100"), WithdrawEffect::NotFound);
        assert_eq!(
            index.withdraw(&"10.1.0.0/24".parse().unwrap(), "Ethernet0"),
            WithdrawEffect::NotFound
        );
    }

    #[test]
    fn test_reinstate_head_restores_order() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        index.insert(subnet("10.0.0.0/24", "Vlan100"));

        let prefix: IpPrefix = "10.0.0.0/24".parse().unwrap();
        let WithdrawEffect::HeadChanged { removed, .. } = index.withdraw(&prefix, "Ethernet0")
        else {
            panic!("expected head change");
        };

        index.reinstate_head(removed);
        assert!(index.is_head(&prefix, "Ethernet0"));
        assert_eq!(index.list(&prefix).len(), 2);
    }

    #[test]
    fn test_lists_are_per_prefix() {
        let mut index = IntfRouteIndex::new();
        index.insert(subnet("10.0.0.0/24", "Ethernet0"));
        index.insert(subnet("10.1.0.0/24", "Ethernet0"));

        assert_eq!(index.len(), 2);
        assert!(index.is_head(&"10.0.0.0/24".parse().unwrap(), "Ethernet0"));
        assert!(index.is_head(&"10.1.0.0/24".parse().unwrap(), "Ethernet0"));
    }
}
