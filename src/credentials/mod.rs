//! Signed-credential subsystem.
//!
//! # Data Flow
//! ```text
//! transport/ needs a header for (owner key, region, endpoint):
//!     → cache.rs (in-memory record usable? return it)
//!     → identity/ (resolve account id, once per key)
//!     → store.rs (persisted record for this account and endpoint?)
//!     → signer.rs (assume admin role, presign GetCallerIdentity)
//!     → store.rs (persist the new record)
//! ```
//!
//! # Invariants
//! - A header is never handed out at or after its expiry
//! - A header generated for one endpoint is never sent to another

pub mod cache;
pub mod record;
pub mod signer;
pub mod store;

pub use cache::CredentialCache;
pub use record::CredentialRecord;
pub use signer::{SignedHeaderGenerator, StsHeaderGenerator};
pub use store::CredentialStore;
