//! Hardware abstraction layer for the router-interface control plane.
//!
//! The forwarding-plane driver is reached through two layers:
//!
//! - [`SwitchDriver`]: the raw driver boundary. One call per hardware
//!   operation, typed errors, no policy.
//! - [`HalGateway`]: the facade the control plane uses. It adds create/remove
//!   idempotency (`AlreadyExists` on create and `NotFound` on remove are
//!   success), maintains the route resource counters, and fires the
//!   next-hop-change observers on subnet-route install/uninstall.
//!
//! [`MockSwitchDriver`] records every operation and supports failure
//! injection, and backs the control-plane tests.

mod counters;
mod driver;
mod error;
mod gateway;
mod mock;
mod observer;
mod types;

pub use counters::{ResourceCounters, ResourceKind, ResourceUsage};
pub use driver::{RifBinding, RifSpec, RouteKey, RouteNextHop, SwitchDriver};
pub use error::{HalError, HalResult};
pub use gateway::HalGateway;
pub use mock::{MockOp, MockSwitchDriver};
pub use observer::{NextHopChange, NextHopEvent, NextHopObserver, ObserverHandle};
pub use types::{
    LagHandle, ObjectId, ObjectKind, PortHandle, RawObjectId, RouterInterfaceHandle, VlanHandle,
    VrfHandle,
};
