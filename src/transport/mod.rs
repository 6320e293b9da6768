//! Retrying transport subsystem.
//!
//! # Data Flow
//! ```text
//! api/ operation (method, path, JSON body)
//!     → client.rs (request_id span)
//!     → credentials/ (signed header, fetched per attempt)
//!     → reqwest (Content-Type, x-api-key, X-Sts-Gci-Headers)
//!     → resilience/ (429? wait and retry, up to max_retries)
//!     → errors.rs (non-2xx → Backend {code, message} or Http {status})
//! ```
//!
//! # Design Decisions
//! - Only 429 is retried, for every method alike; mutations must be
//!   idempotent by resource id
//! - Exhausted retries return the last 429 as a structured error
//! - Cancellation aborts both the in-flight call and the backoff wait

pub mod client;
pub mod errors;

pub use client::{Transport, TransportTarget, API_KEY_HEADER, SIGNED_HEADER};
pub use errors::error_from_response;
