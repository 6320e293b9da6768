//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! credentials/, transport/, reconcile/ produce:
//!     → tracing events and spans (request_id per API request)
//!     → metrics.rs (counters through the `metrics` facade)
//!
//! Consumers:
//!     → logging.rs subscriber installed by the `hlb` binary (stderr, pretty or JSON)
//!     → any `metrics` recorder installed by the embedding application
//! ```
//!
//! # Design Decisions
//! - Secrets (API key, signed header, AWS keys) are never logged
//! - Request and response bodies only at debug/trace

pub mod logging;
pub mod metrics;
