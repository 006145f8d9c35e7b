//! Route resource accounting.
//!
//! The gateway bumps a used-counter bucket per installed route so external
//! telemetry can read resource pressure without touching the driver.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracked resource buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Ipv4Route,
    Ipv6Route,
}

impl ResourceKind {
    /// Returns the telemetry field name for this bucket.
    pub const fn name(&self) -> &'static str {
        match self {
            ResourceKind::Ipv4Route => "ipv4_route",
            ResourceKind::Ipv6Route => "ipv6_route",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceUsage {
    pub ipv4_routes: u64,
    pub ipv6_routes: u64,
}

/// Used-resource counters, written only from the reconciler context.
///
/// External readers tolerate the at-most-one-writer model without further
/// synchronization.
#[derive(Debug, Default)]
pub struct ResourceCounters {
    ipv4_routes: AtomicU64,
    ipv6_routes: AtomicU64,
}

impl ResourceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the used counter for a bucket.
    pub fn increment(&self, kind: ResourceKind) {
        self.bucket(kind).fetch_add(1, Ordering::Relaxed);
    }

    /// Decrements the used counter for a bucket, saturating at zero.
    pub fn decrement(&self, kind: ResourceKind) {
        let bucket = self.bucket(kind);
        let mut current = bucket.load(Ordering::Relaxed);
        while current > 0 {
            match bucket.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return,
                Err(observed) => current = observed,
            }
        }
    }

    /// Returns the used count for a bucket.
    pub fn used(&self, kind: ResourceKind) -> u64 {
        self.bucket(kind).load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all buckets.
    pub fn snapshot(&self) -> ResourceUsage {
        ResourceUsage {
            ipv4_routes: self.used(ResourceKind::Ipv4Route),
            ipv6_routes: self.used(ResourceKind::Ipv6Route),
        }
    }

    fn bucket(&self, kind: ResourceKind) -> &AtomicU64 {
        match kind {
            ResourceKind::Ipv4Route => &self.ipv4_routes,
            ResourceKind::Ipv6Route => &self.ipv6_routes,
        }
    }
}
