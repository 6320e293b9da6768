//! STS client over plain HTTPS.
//!
//! # Responsibilities
//! - `GetCallerIdentity` to resolve the caller's account id
//! - `AssumeRole` for temporary administrative credentials
//! - Presign `GetCallerIdentity` bound to an HLB endpoint hostname
//!
//! # Design Decisions
//! - Query protocol (form POST, XML response) decoded with quick-xml
//! - STS failures are local credential errors, never retried here

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{HlbError, HlbResult};
use crate::identity::sigv4::{self, SigningScope};
use crate::identity::types::{AwsCredentials, CallerIdentity};
use crate::identity::IdentityService;

const STS_API_VERSION: &str = "2011-06-15";
const STS_SERVICE: &str = "sts";

/// Lifetime of a presigned `GetCallerIdentity` URL.
pub const PRESIGN_EXPIRES_SECS: u64 = 900;

/// Header carrying the HLB endpoint inside the presigned request.
pub const ENDPOINT_HEADER: &str = "x-hlb-endpoint";

#[derive(Debug, Deserialize)]
struct GetCallerIdentityResponse {
    #[serde(rename = "GetCallerIdentityResult")]
    result: GetCallerIdentityResult,
}

#[derive(Debug, Deserialize)]
struct GetCallerIdentityResult {
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Arn", default)]
    arn: String,
    #[serde(rename = "UserId", default)]
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
struct AssumeRoleResult {
    #[serde(rename = "Credentials")]
    credentials: StsCredentials,
}

#[derive(Debug, Deserialize)]
struct StsCredentials {
    #[serde(rename = "AccessKeyId")]
    access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: String,
    #[serde(rename = "SessionToken")]
    session_token: String,
    #[serde(rename = "Expiration", default)]
    expiration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StsErrorResponse {
    #[serde(rename = "Error")]
    error: StsError,
}

#[derive(Debug, Deserialize)]
struct StsError {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// STS endpoint for a region and partition.
pub fn regional_endpoint(region: &str, partition: &str) -> String {
    let suffix = match partition {
        "aws-cn" => "amazonaws.com.cn",
        _ => "amazonaws.com",
    };
    format!("https://sts.{}.{}/", region, suffix)
}

/// Identity service backed by AWS STS.
#[derive(Clone)]
pub struct StsClient {
    http: reqwest::Client,
    endpoint: Url,
    region: String,
    base: AwsCredentials,
}

impl StsClient {
    /// Create a client signing with `base` credentials.
    pub fn new(config: &ClientConfig, base: AwsCredentials) -> HlbResult<Self> {
        let endpoint = config
            .identity
            .sts_endpoint
            .clone()
            .unwrap_or_else(|| regional_endpoint(&config.region, config.partition()));
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| HlbError::Config(format!("Invalid STS endpoint '{}': {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.identity.timeout_secs))
            .build()
            .map_err(HlbError::Network)?;

        Ok(Self {
            http,
            endpoint,
            region: config.region.clone(),
            base,
        })
    }

    fn scope(&self) -> SigningScope<'_> {
        SigningScope {
            region: &self.region,
            service: STS_SERVICE,
            time: Utc::now(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        credentials: &AwsCredentials,
        params: &[(&str, &str)],
    ) -> HlbResult<T> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", action)
            .extend_pairs(params.iter().copied())
            .append_pair("Version", STS_API_VERSION)
            .finish();

        let mut request = self.http.post(self.endpoint.clone());
        for (name, value) in sigv4::sign_form_post(credentials, &self.scope(), &self.endpoint, &body)? {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| HlbError::Credentials(format!("STS {} request failed: {}", action, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HlbError::Credentials(format!("STS {} response unreadable: {}", action, e)))?;

        if !status.is_success() {
            let detail = match quick_xml::de::from_str::<StsErrorResponse>(&text) {
                Ok(err) => format!("{}: {}", err.error.code, err.error.message),
                Err(_) => text,
            };
            return Err(HlbError::Credentials(format!(
                "STS {} failed with HTTP {}: {}",
                action,
                status.as_u16(),
                detail
            )));
        }

        quick_xml::de::from_str(&text).map_err(|e| {
            HlbError::Credentials(format!("Failed to parse STS {} response: {}", action, e))
        })
    }

    /// Full `GetCallerIdentity` result for the base credentials.
    pub async fn caller_identity(&self) -> HlbResult<CallerIdentity> {
        let response: GetCallerIdentityResponse =
            self.call("GetCallerIdentity", &self.base, &[]).await?;
        Ok(CallerIdentity {
            account: response.result.account,
            arn: response.result.arn,
            user_id: response.result.user_id,
        })
    }
}

#[async_trait]
impl IdentityService for StsClient {
    async fn caller_account_id(&self) -> HlbResult<String> {
        let identity = self.caller_identity().await?;
        tracing::debug!(account_id = %identity.account, arn = %identity.arn, "Resolved caller identity");
        Ok(identity.account)
    }

    async fn assume_role(&self, role_arn: &str, session_name: &str) -> HlbResult<AwsCredentials> {
        let response: AssumeRoleResponse = self
            .call(
                "AssumeRole",
                &self.base,
                &[("RoleArn", role_arn), ("RoleSessionName", session_name)],
            )
            .await
            .map_err(|e| match e {
                HlbError::Credentials(msg) => {
                    HlbError::Credentials(format!("failed to assume role: {}", msg))
                }
                other => other,
            })?;

        let creds = response.result.credentials;
        tracing::info!(role_arn = %role_arn, "Assumed administrative role");

        Ok(AwsCredentials {
            access_key_id: creds.access_key_id,
            secret_access_key: creds.secret_access_key,
            session_token: Some(creds.session_token),
            expiration: creds
                .expiration
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc)),
        })
    }

    fn presign_caller_identity(
        &self,
        credentials: &AwsCredentials,
        endpoint_host: &str,
    ) -> HlbResult<String> {
        let url = sigv4::presign_get(
            credentials,
            &self.scope(),
            &self.endpoint,
            &[("Action", "GetCallerIdentity"), ("Version", STS_API_VERSION)],
            &[(ENDPOINT_HEADER, endpoint_host)],
            PRESIGN_EXPIRES_SECS,
        )?;
        Ok(url.into())
    }
}

impl std::fmt::Debug for StsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("region", &self.region)
            .finish()
    }
}
