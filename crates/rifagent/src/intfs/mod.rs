//! Router-interface reconciliation.
//!
//! Three pieces cooperate here:
//!
//! - [`RifTable`]: interface name -> [`RifEntry`] (address set, reference
//!   count, VRF binding); owns the RIF lifecycle against the HAL.
//! - [`IntfRouteIndex`]: canonical prefix -> overlap list of interface
//!   routes; the list head is the entry installed in hardware, shadows wait
//!   in arrival order and resurrect FIFO when the head is withdrawn.
//! - [`IntfsOrch`]: the reconciler driving both from the configuration-bus
//!   event stream.

mod orch;
mod routes;
mod table;
mod types;

pub use orch::{IntfsOrch, IntfsOrchConfig, IntfsOrchStats};
pub use routes::{InsertOutcome, IntfRouteIndex, WithdrawEffect};
pub use table::{RifRemoval, RifTable};
pub use types::{IntfRoute, RifEntry, RouteKind};
