//! Router-interface control plane.
//!
//! The agent reconciles desired Layer-3 interface configuration against the
//! forwarding plane: it owns router-interface objects, the auxiliary routes
//! every L3 address implies (subnet route, IP2Me host route, and the
//! directed-broadcast neighbor for IPv4 VLAN subnets), and the overlap
//! bookkeeping between interfaces sharing a prefix.
//!
//! ```text
//! [config bus] ──> [IntfsOrch] ──> {PortDirectory, RifTable, IntfRouteIndex}
//!                                        │
//!                                        └──> [HalGateway] ──> driver
//! ```
//!
//! The reconciler is the sole mutator of the RIF table and the route index;
//! the port and VRF directories are owned by external managers and only read
//! here (the RIF handle write-back after create/remove is the one exception).

pub mod daemon;
pub mod intfs;
pub mod ports;
pub mod vrf;

pub use intfs::{IntfsOrch, IntfsOrchConfig, IntfsOrchStats};
pub use ports::{Port, PortDirectory};
pub use vrf::VrfDirectory;
