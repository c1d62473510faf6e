//! `extbridge-dispatch`: the boundary between a native engine and the host.
//!
//! The native engine cannot reach chain history, the randomness beacon, or
//! block storage itself. It calls back through fixed-signature entry points
//! that this crate services:
//!
//! - **Handle registry:** opaque integer handles mapped to registered
//!   `Externs` bindings, never reused
//! - **Dispatch:** randomness, consensus-fault verification, tipset lookup,
//!   and blockstore get/put/put-many/has/view, each mapped to a status code
//! - **Fault containment:** a panic in a capability becomes `Panic` for that
//!   one call and never unwinds into the engine
//! - **Buffer ownership:** borrowed inputs, caller-owned outputs, and
//!   explicitly released `OwnedBuffer`s
//! - **Reservation session:** a bracketed, exactly-accounted allotment of
//!   funds around one unit of execution
//!
//! The safe entry points live on [`Bridge`]; [`ffi`] exposes them to C.

pub mod error;
pub mod config;
pub mod memory;
pub mod containment;
pub mod registry;
pub mod reservation;
pub mod bridge;
pub mod ffi;

pub use error::{BridgeError, BridgeResult};
pub use config::BridgeConfig;
pub use memory::{outstanding_buffers, OwnedBuffer};
pub use registry::{Binding, Registry};
pub use reservation::{ReservationError, ReservationResult, ReservationSession};
pub use bridge::Bridge;
pub use ffi::{install, InstallGuard};
