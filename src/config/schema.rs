//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Partition used when none is configured.
pub const DEFAULT_PARTITION: &str = "aws";

/// Root configuration for the HLB client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// HLB API key, sent as `x-api-key` and used to namespace cached credentials.
    pub api_key: String,

    /// AWS region hosting the control plane (e.g., "us-east-1").
    pub region: String,

    /// AWS partition (e.g., "aws", "aws-cn").
    pub partition: String,

    /// Base URL override (e.g., "https://hlb.example.test/v1").
    pub endpoint: Option<String>,

    /// Identity service settings.
    pub identity: IdentityConfig,

    /// Signed-header cache settings.
    pub credentials: CredentialsConfig,

    /// Rate-limit retry configuration.
    pub retries: RetryConfig,

    /// Resource reconciliation configuration.
    pub reconcile: ReconcileConfig,

    /// HTTP timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl ClientConfig {
    /// Partition, falling back to [`DEFAULT_PARTITION`].
    pub fn partition(&self) -> &str {
        if self.partition.is_empty() {
            DEFAULT_PARTITION
        } else {
            &self.partition
        }
    }

    /// Hostname of the control plane the signed header is bound to.
    pub fn hostname(&self) -> String {
        if let Some(host) = self
            .endpoint
            .as_deref()
            .and_then(|e| url::Url::parse(e).ok())
            .and_then(|u| u.host_str().map(str::to_string))
        {
            return host;
        }
        format!("hlb.{}.{}.zonehero.cloud", self.region, self.partition())
    }

    /// Base URL every API path is appended to.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}/v1", self.hostname()),
        }
    }
}

/// Identity service (STS) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Shared config/credentials profile for the base AWS credentials.
    pub profile: Option<String>,

    /// STS endpoint override; derived from region and partition when unset.
    pub sts_endpoint: Option<String>,

    /// Role path and name assumed in the caller's account.
    pub admin_role: String,

    /// Session name used for role assumption.
    pub session_name: String,

    /// STS request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            profile: None,
            sts_endpoint: None,
            admin_role: "hlb/hlb-admin-users-role".to_string(),
            session_name: "HLBClientSession".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Signed-header cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Credential file override; defaults to `~/.hlb/credentials`.
    pub store_path: Option<String>,

    /// How long a freshly generated header is reused, in seconds.
    pub validity_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            validity_secs: 15 * 60,
        }
    }
}

/// Retry configuration for rate-limited requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Minimum wait between attempts in milliseconds.
    pub min_wait_ms: u64,

    /// Maximum wait between attempts in milliseconds.
    pub max_wait_ms: u64,
}

impl RetryConfig {
    pub fn min_wait(&self) -> Duration {
        Duration::from_millis(self.min_wait_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_wait_ms: 1_000,
            max_wait_ms: 30_000,
        }
    }
}

/// Reconciliation (state polling) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// First wait between polls in milliseconds.
    pub poll_min_ms: u64,

    /// Longest wait between polls in milliseconds.
    pub poll_max_ms: u64,

    /// Create convergence timeout in seconds.
    pub create_timeout_secs: u64,

    /// Update convergence timeout in seconds.
    pub update_timeout_secs: u64,

    /// Delete convergence timeout in seconds.
    pub delete_timeout_secs: u64,
}

impl ReconcileConfig {
    pub fn poll_min(&self) -> Duration {
        Duration::from_millis(self.poll_min_ms)
    }

    pub fn poll_max(&self) -> Duration {
        Duration::from_millis(self.poll_max_ms)
    }

    pub fn create_timeout(&self) -> Duration {
        Duration::from_secs(self.create_timeout_secs)
    }

    pub fn update_timeout(&self) -> Duration {
        Duration::from_secs(self.update_timeout_secs)
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_secs(self.delete_timeout_secs)
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_min_ms: 500,
            poll_max_ms: 10_000,
            create_timeout_secs: 30 * 60,
            update_timeout_secs: 30 * 60,
            delete_timeout_secs: 30 * 60,
        }
    }
}

/// Timeout configuration for HTTP calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 10,
            request_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
