//! Base AWS credential resolution.
//!
//! # Responsibilities
//! - Load keys for a named profile from the shared AWS config and credentials files
//! - Without a profile: environment variables first, then the default provider chain
//!   (default profile, SSO, web identity, container and instance metadata)
//!
//! # Design Decisions
//! - Resolution happens once per client; role assumption derives the
//!   short-lived credentials actually used for signing

use std::path::Path;
use std::time::SystemTime;

use aws_config::default_provider::credentials::DefaultCredentialsChain;
use aws_config::profile::profile_file::{ProfileFileKind, ProfileFiles};
use aws_config::profile::ProfileFileCredentialsProvider;
use aws_config::Region;
use aws_credential_types::provider::ProvideCredentials;
use aws_credential_types::Credentials;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{HlbError, HlbResult};
use crate::identity::types::AwsCredentials;

/// Base credentials for `profile`, or from the environment and default chain.
pub async fn resolve_base_credentials(profile: Option<&str>, region: &str) -> HlbResult<AwsCredentials> {
    if let Some(profile) = profile.filter(|p| !p.is_empty()) {
        return profile_credentials(profile, None).await;
    }

    if let Ok(credentials) = AwsCredentials::from_env() {
        debug!("Using AWS credentials from environment");
        return Ok(credentials);
    }

    let chain = DefaultCredentialsChain::builder()
        .region(Region::new(region.to_string()))
        .build()
        .await;
    provide(&chain, "default credential chain").await
}

/// Credentials for `profile`. `credentials_file` replaces the default
/// shared files when given.
pub async fn profile_credentials(
    profile: &str,
    credentials_file: Option<&Path>,
) -> HlbResult<AwsCredentials> {
    debug!(profile, "Loading AWS credentials from shared profile");

    let mut builder = ProfileFileCredentialsProvider::builder().profile_name(profile);
    if let Some(path) = credentials_file {
        let files = ProfileFiles::builder()
            .with_file(ProfileFileKind::Credentials, path)
            .build();
        builder = builder.profile_files(files);
    }
    provide(&builder.build(), &format!("profile '{}'", profile)).await
}

async fn provide(provider: &impl ProvideCredentials, source: &str) -> HlbResult<AwsCredentials> {
    let credentials = provider.provide_credentials().await.map_err(|e| {
        HlbError::Credentials(format!("failed to load AWS credentials from {}: {}", source, e))
    })?;
    Ok(AwsCredentials::from(credentials))
}

impl From<Credentials> for AwsCredentials {
    fn from(credentials: Credentials) -> Self {
        let mut converted = AwsCredentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            credentials.session_token().map(str::to_string),
        );
        converted.expiration = credentials.expiry().map(|t: SystemTime| DateTime::<Utc>::from(t));
        converted
    }
}
