//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     Ctrl-C → Shutdown::trigger → every child token cancelled
//!
//! Cancellation (shutdown.rs):
//!     transport/ request or backoff wait  ─┐
//!     reconcile/ poll read or poll wait   ─┴→ aborted with HlbError::Cancelled
//! ```
//!
//! # Design Decisions
//! - Cancellation is cooperative and checked at every suspension point
//! - Interrupting twice forces exit

pub mod shutdown;
pub mod signals;

pub use shutdown::{cancellable_sleep, run_cancellable, Shutdown};
