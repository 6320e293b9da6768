//! HLB resource API.
//!
//! # Data Flow
//! ```text
//! HlbClient operation
//!     → transport/ (signed, rate-limit aware request)
//!     → types.rs (decode LoadBalancer / Listener / Page)
//!     → reconcile/ (mutations only: wait for active or deleted)
//! ```
//!
//! # Paths
//! - `/aws_account/{account}/load-balancers[/{id}]`
//! - `/aws_account/{account}/load-balancers/{lb}/listeners[/{id}]`

pub mod client;
pub mod types;

pub use client::HlbClient;
pub use types::{
    AccessLogs, DeploymentStatus, LaunchConfig, Listener, ListenerCreate, ListenerUpdate,
    LoadBalancer, LoadBalancerCreate, LoadBalancerUpdate, Page,
};
