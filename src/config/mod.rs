//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → CLI flag overrides
//!     → environment fills unset fields (HLB_API_KEY, AWS_REGION, ...)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once the client is built
//! - Every section has defaults; a file with only `api_key` and `region` is valid
//! - Precedence: CLI flags, then file values, then environment for unset fields

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::ClientConfig;
pub use schema::CredentialsConfig;
pub use schema::IdentityConfig;
pub use schema::ObservabilityConfig;
pub use schema::ReconcileConfig;
pub use schema::RetryConfig;
pub use schema::TimeoutConfig;
