//! Identity types.

use chrono::{DateTime, Utc};

use crate::error::{HlbError, HlbResult};

/// Environment variable holding the access key id.
pub const ACCESS_KEY_ENV_VAR: &str = "AWS_ACCESS_KEY_ID";
/// Environment variable holding the secret access key.
pub const SECRET_KEY_ENV_VAR: &str = "AWS_SECRET_ACCESS_KEY";
/// Environment variable holding the optional session token.
pub const SESSION_TOKEN_ENV_VAR: &str = "AWS_SESSION_TOKEN";

/// AWS access keys, long-lived or temporary.
///
/// Secrets are never printed: the `Debug` impl redacts them.
#[derive(Clone, PartialEq, Eq)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    /// Set for temporary credentials returned by role assumption.
    pub expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
            expiration: None,
        }
    }

    /// Load base credentials from the standard AWS environment variables.
    pub fn from_env() -> HlbResult<Self> {
        let access_key_id = non_empty_env(ACCESS_KEY_ENV_VAR).ok_or_else(|| {
            HlbError::Config(format!("Environment variable {} not set", ACCESS_KEY_ENV_VAR))
        })?;
        let secret_access_key = non_empty_env(SECRET_KEY_ENV_VAR).ok_or_else(|| {
            HlbError::Config(format!("Environment variable {} not set", SECRET_KEY_ENV_VAR))
        })?;

        Ok(Self::new(
            access_key_id,
            secret_access_key,
            non_empty_env(SESSION_TOKEN_ENV_VAR),
        ))
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Result of `GetCallerIdentity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub account: String,
    pub arn: String,
    pub user_id: String,
}
