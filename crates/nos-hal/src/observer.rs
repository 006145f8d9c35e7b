//! Next-hop-change observer registry.
//!
//! Routing components register here to learn when a subnet route starts or
//! stops pointing at a router interface. Registration returns an owned
//! handle so observers can deregister.

use crate::driver::RouteKey;
use crate::types::RouterInterfaceHandle;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Direction of a subnet-route change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextHopChange {
    Installed,
    Removed,
}

/// A subnet-route install/uninstall notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextHopEvent {
    pub route: RouteKey,
    pub rif: RouterInterfaceHandle,
    pub change: NextHopChange,
}

/// Callback interface for next-hop-change notifications.
pub trait NextHopObserver: Send + Sync {
    fn on_next_hop_change(&self, event: &NextHopEvent);
}

/// Handle returned by [`ObserverRegistry::register`]; pass it back to
/// [`ObserverRegistry::unregister`] to stop receiving notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Mutex<HashMap<u64, Arc<dyn NextHopObserver>>>,
    next_id: Mutex<u64>,
}

impl ObserverRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, observer: Arc<dyn NextHopObserver>) -> ObserverHandle {
        let mut next_id = self.next_id.lock();
        *next_id += 1;
        let id = *next_id;
        drop(next_id);

        self.observers.lock().insert(id, observer);
        ObserverHandle(id)
    }

    pub(crate) fn unregister(&self, handle: ObserverHandle) -> bool {
        self.observers.lock().remove(&handle.0).is_some()
    }

    pub(crate) fn notify(&self, event: &NextHopEvent) {
        let observers: Vec<Arc<dyn NextHopObserver>> =
            self.observers.lock().values().cloned().collect();
        for observer in observers {
            observer.on_next_hop_change(event);
        }
    }
}
