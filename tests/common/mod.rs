//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hlb_client::config::ClientConfig;
use hlb_client::credentials::{CredentialCache, CredentialStore, SignedHeaderGenerator};
use hlb_client::identity::{AwsCredentials, IdentityService};
use hlb_client::{HlbClient, HlbResult};
use tempfile::TempDir;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

pub const ACCOUNT_ID: &str = "123456789012";
pub const API_KEY: &str = "test-api-key";

/// Identity service that always resolves [`ACCOUNT_ID`].
#[derive(Default)]
pub struct MockIdentity {
    pub account_calls: AtomicUsize,
}

#[async_trait]
impl IdentityService for MockIdentity {
    async fn caller_account_id(&self) -> HlbResult<String> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        Ok(ACCOUNT_ID.to_string())
    }

    async fn assume_role(&self, _role_arn: &str, _session_name: &str) -> HlbResult<AwsCredentials> {
        Ok(AwsCredentials::new("ASIAMOCK", "mock-secret", Some("mock-token".into())))
    }

    fn presign_caller_identity(
        &self,
        _credentials: &AwsCredentials,
        endpoint_host: &str,
    ) -> HlbResult<String> {
        Ok(format!(
            "https://sts.amazonaws.com/?Action=GetCallerIdentity&x-hlb-endpoint={}",
            endpoint_host
        ))
    }
}

/// Generator producing `signed-{n}` headers and counting calls.
#[derive(Default)]
pub struct MockGenerator {
    pub calls: AtomicUsize,
}

impl MockGenerator {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignedHeaderGenerator for MockGenerator {
    async fn generate(&self, _account_id: &str, _endpoint_host: &str) -> HlbResult<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("signed-{}", n))
    }
}

/// Configuration pointing at a mock server with fast retries and polling.
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig {
        api_key: API_KEY.into(),
        region: "us-east-1".into(),
        endpoint: Some(format!("{}/v1", server.uri())),
        ..Default::default()
    };
    config.retries.max_retries = 2;
    config.retries.min_wait_ms = 10;
    config.retries.max_wait_ms = 50;
    config.reconcile.poll_min_ms = 5;
    config.reconcile.poll_max_ms = 20;
    config.reconcile.create_timeout_secs = 5;
    config.reconcile.update_timeout_secs = 5;
    config.reconcile.delete_timeout_secs = 5;
    config
}

pub struct Harness {
    pub dir: TempDir,
    pub identity: Arc<MockIdentity>,
    pub generator: Arc<MockGenerator>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            identity: Arc::new(MockIdentity::default()),
            generator: Arc::new(MockGenerator::default()),
        }
    }

    pub fn store(&self) -> CredentialStore {
        CredentialStore::new(self.dir.path().join("credentials"))
    }

    pub fn cache(&self, validity: chrono::Duration) -> Arc<CredentialCache> {
        Arc::new(
            CredentialCache::new(self.store(), self.identity.clone(), self.generator.clone())
                .with_validity(validity),
        )
    }

    pub async fn client(&self, config: ClientConfig) -> HlbClient {
        HlbClient::with_parts(config, self.identity.clone(), self.generator.clone(), self.store())
            .await
            .unwrap()
    }
}

/// Replays responses in order; the last one repeats.
pub struct Sequence {
    responses: Vec<ResponseTemplate>,
    served: AtomicUsize,
}

impl Sequence {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses,
            served: AtomicUsize::new(0),
        }
    }

    /// JSON bodies with status 200.
    pub fn json(bodies: Vec<serde_json::Value>) -> Self {
        Self::new(
            bodies
                .into_iter()
                .map(|b| ResponseTemplate::new(200).set_body_json(b))
                .collect(),
        )
    }
}

impl Respond for Sequence {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.served.fetch_add(1, Ordering::SeqCst);
        self.responses[n.min(self.responses.len() - 1)].clone()
    }
}

/// Records the signed header of every request it answers.
pub struct HeaderRecorder {
    pub seen: Arc<Mutex<Vec<String>>>,
    inner: Sequence,
}

impl HeaderRecorder {
    pub fn new(inner: Sequence) -> (Self, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                seen: seen.clone(),
                inner,
            },
            seen,
        )
    }
}

impl Respond for HeaderRecorder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let header = request
            .headers
            .get("x-sts-gci-headers")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.seen.lock().unwrap().push(header);
        self.inner.respond(request)
    }
}

pub fn load_balancer(id: &str, state: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "web",
        "state": state,
        "accountId": ACCOUNT_ID,
        "dnsName": format!("{}.hlb.example", id),
        "subnets": ["subnet-a", "subnet-b"],
    })
}

pub fn lb_path(suffix: &str) -> String {
    format!("/v1/aws_account/{}/load-balancers{}", ACCOUNT_ID, suffix)
}
