//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! transport/ attempt finished:
//!     → retries.rs (RetryPolicy: retry this status?)
//!     → retries.rs (delay from Retry-After, or backoff.rs)
//!
//! reconcile/ resource still transitional:
//!     → backoff.rs (poll interval, min to max)
//! ```
//!
//! # Design Decisions
//! - Waits are always bounded by a configured maximum
//! - Policies are plain values so they can be tested without a transport

pub mod backoff;
pub mod retries;

pub use retries::{RateLimitPolicy, RetryPolicy};
