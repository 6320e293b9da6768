//! Signed-header generation.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{HlbError, HlbResult};
use crate::identity::IdentityService;

/// Produces the opaque `X-Sts-Gci-Headers` value for an account and endpoint.
#[async_trait]
pub trait SignedHeaderGenerator: Send + Sync {
    async fn generate(&self, account_id: &str, endpoint_host: &str) -> HlbResult<String>;
}

/// Generator that assumes the HLB administrative role and presigns
/// `GetCallerIdentity` with the assumed credentials.
pub struct StsHeaderGenerator {
    identity: Arc<dyn IdentityService>,
    partition: String,
    admin_role: String,
    session_name: String,
}

impl StsHeaderGenerator {
    pub fn new(identity: Arc<dyn IdentityService>, config: &ClientConfig) -> Self {
        Self {
            identity,
            partition: config.partition().to_string(),
            admin_role: config.identity.admin_role.clone(),
            session_name: config.identity.session_name.clone(),
        }
    }

    /// `arn:{partition}:iam::{account}:role/{admin_role}`
    pub fn role_arn(&self, account_id: &str) -> String {
        format!(
            "arn:{}:iam::{}:role/{}",
            self.partition, account_id, self.admin_role
        )
    }
}

#[async_trait]
impl SignedHeaderGenerator for StsHeaderGenerator {
    async fn generate(&self, account_id: &str, endpoint_host: &str) -> HlbResult<String> {
        let role_arn = self.role_arn(account_id);
        let credentials = self
            .identity
            .assume_role(&role_arn, &self.session_name)
            .await?;

        let presigned = self
            .identity
            .presign_caller_identity(&credentials, endpoint_host)?;

        header_from_presigned_url(&presigned)
    }
}

/// Encode the query parameters of a presigned URL as a header value,
/// keys in sorted order.
pub fn header_from_presigned_url(presigned: &str) -> HlbResult<String> {
    let url = Url::parse(presigned)
        .map_err(|e| HlbError::Credentials(format!("failed to parse presigned URL: {}", e)))?;

    let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    if pairs.is_empty() {
        return Err(HlbError::Credentials(
            "presigned URL carries no query parameters".into(),
        ));
    }
    pairs.sort();

    Ok(url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish())
}
