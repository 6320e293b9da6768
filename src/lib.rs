//! Client library for the HLB load-balancer control plane.
//!
//! Requests are authorized with a short-lived signed header derived from a
//! presigned STS `GetCallerIdentity` call, cached per API key and region
//! and persisted under `~/.hlb/credentials`. Mutations are asynchronous on
//! the service side; the client polls until the resource settles.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod reconcile;
pub mod resilience;
pub mod transport;

pub use api::HlbClient;
pub use config::ClientConfig;
pub use error::{ErrorKind, ErrorOrigin, HlbError, HlbResult};
pub use lifecycle::Shutdown;
