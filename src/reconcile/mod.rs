//! Resource reconciliation subsystem.
//!
//! # Data Flow
//! ```text
//! api/ mutation accepted (create, update, delete)
//!     → reconciler.rs (await_state: id, target states, timeout)
//!     → ResourceReader::read (GET through transport/, fresh copy each time)
//!     → state.rs (classify: transitional, settled, failed, unexpected)
//!     → transitional: wait poll_min..poll_max, read again
//! ```
//!
//! # State Progression
//! ```text
//! pending_creation → creating → active
//! active → pending_update → updating → active
//! active → pending_delete → deleting → deleted
//! any pending/transitional state → failed (terminal)
//! ```
//!
//! # Design Decisions
//! - Read errors are fatal here; transient network conditions belong to transport/
//! - Timeouts are reported separately from failed states
//! - The reconciler never mutates the resource it watches

pub mod reconciler;
pub mod state;

pub use reconciler::{Observed, Reconciler, ResourceReader};
pub use state::{ResourceState, StateClass};
