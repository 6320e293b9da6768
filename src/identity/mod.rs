//! Cloud identity subsystem.
//!
//! # Data Flow
//! ```text
//! Named profile (--profile, AWS_PROFILE, identity.profile)
//!   or environment (AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN)
//!   or default provider chain
//!     → profile.rs (resolve_base_credentials)
//!     → types.rs (AwsCredentials)
//!     → sts.rs (GetCallerIdentity, AssumeRole, presigned GetCallerIdentity)
//!     → sigv4.rs (canonical request, signing key, header/query signatures)
//! ```
//!
//! # Security Constraints
//! - Secret keys and session tokens are never logged
//! - Presigned requests sign the HLB endpoint hostname as a header

pub mod profile;
pub mod sigv4;
pub mod sts;
pub mod types;

use async_trait::async_trait;

use crate::error::HlbResult;

pub use profile::resolve_base_credentials;
pub use sts::StsClient;
pub use types::{AwsCredentials, CallerIdentity};

/// Operations the client needs from the cloud identity service.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Account id of the configured caller.
    async fn caller_account_id(&self) -> HlbResult<String>;

    /// Temporary credentials for `role_arn`.
    async fn assume_role(&self, role_arn: &str, session_name: &str) -> HlbResult<AwsCredentials>;

    /// Presigned `GetCallerIdentity` URL for `credentials`, with
    /// `endpoint_host` signed in so the result is only valid for that endpoint.
    fn presign_caller_identity(
        &self,
        credentials: &AwsCredentials,
        endpoint_host: &str,
    ) -> HlbResult<String>;
}
