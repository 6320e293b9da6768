//! Retrying HTTP transport for the HLB API.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn, Instrument};
use uuid::Uuid;

use crate::config::{ClientConfig, RetryConfig};
use crate::credentials::CredentialCache;
use crate::error::{HlbError, HlbResult};
use crate::lifecycle::{cancellable_sleep, run_cancellable};
use crate::observability::metrics;
use crate::resilience::retries::{parse_retry_after, retry_delay};
use crate::resilience::{RateLimitPolicy, RetryPolicy};
use crate::transport::errors::error_from_response;

/// Static API key header.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Signed identity header.
pub const SIGNED_HEADER: &str = "X-Sts-Gci-Headers";

/// Where the transport sends requests and whose credentials it presents.
#[derive(Debug, Clone)]
pub struct TransportTarget {
    /// Base URL without trailing slash, e.g. `https://hlb.us-east-1.aws.zonehero.cloud/v1`.
    pub base_url: String,
    /// Hostname the signed header is bound to.
    pub endpoint_host: String,
    pub api_key: String,
    pub region: String,
}

impl TransportTarget {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url(),
            endpoint_host: config.hostname(),
            api_key: config.api_key.clone(),
            region: config.region.clone(),
        }
    }
}

/// HTTP client that authenticates every attempt and retries rate limiting.
pub struct Transport {
    http: reqwest::Client,
    target: TransportTarget,
    credentials: Arc<CredentialCache>,
    policy: Arc<dyn RetryPolicy>,
    retries: RetryConfig,
}

impl Transport {
    pub fn new(config: &ClientConfig, credentials: Arc<CredentialCache>) -> HlbResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .build()
            .map_err(HlbError::Network)?;

        Ok(Self {
            http,
            target: TransportTarget::from_config(config),
            credentials,
            policy: Arc::new(RateLimitPolicy),
            retries: config.retries.clone(),
        })
    }

    /// Replace the retry decision strategy.
    pub fn with_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn target(&self) -> &TransportTarget {
        &self.target
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub async fn get<T: DeserializeOwned>(&self, cancel: &CancellationToken, path: &str) -> HlbResult<T> {
        let body = self.send(cancel, Method::GET, path, None).await?;
        decode(&body)
    }

    pub async fn post<B, T>(&self, cancel: &CancellationToken, path: &str, payload: &B) -> HlbResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(cancel, Method::POST, path, Some(serde_json::to_vec(payload)?))
            .await?;
        decode(&body)
    }

    pub async fn put<B, T>(&self, cancel: &CancellationToken, path: &str, payload: &B) -> HlbResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self
            .send(cancel, Method::PUT, path, Some(serde_json::to_vec(payload)?))
            .await?;
        decode(&body)
    }

    pub async fn delete(&self, cancel: &CancellationToken, path: &str) -> HlbResult<()> {
        self.send(cancel, Method::DELETE, path, None).await.map(|_| ())
    }

    /// Send one logical request and return the successful response body.
    ///
    /// The signed header is fetched before every attempt, so a long
    /// backoff never presents an expired header.
    pub async fn send(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HlbResult<String> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("hlb_request", %request_id, method = %method, path = %path);
        self.send_with_retries(cancel, method, path, body)
            .instrument(span)
            .await
    }

    async fn send_with_retries(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> HlbResult<String> {
        let url = format!("{}{}", self.target.base_url, path);
        if let Some(bytes) = &body {
            trace!(body = %String::from_utf8_lossy(bytes), "Request body");
        }

        let mut attempt: u32 = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(HlbError::Cancelled);
            }

            let header = run_cancellable(
                cancel,
                self.credentials.get_header(
                    &self.target.api_key,
                    &self.target.region,
                    &self.target.endpoint_host,
                ),
            )
            .await?;

            let mut request = self
                .http
                .request(method.clone(), &url)
                .header(CONTENT_TYPE, "application/json")
                .header(API_KEY_HEADER, &self.target.api_key)
                .header(SIGNED_HEADER, header);
            if let Some(bytes) = &body {
                request = request.body(bytes.clone());
            }

            debug!(attempt, url = %url, "Sending request");
            let sent = run_cancellable(cancel, async { Ok(request.send().await) }).await?;

            let response = match sent {
                Ok(response) => response,
                Err(e) => {
                    if attempt < self.retries.max_retries && self.policy.should_retry(Some(&e), None) {
                        let delay = retry_delay(&self.retries, attempt, None);
                        warn!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Request failed, retrying");
                        metrics::record_retry();
                        attempt += 1;
                        cancellable_sleep(cancel, delay).await?;
                        continue;
                    }
                    return Err(HlbError::Network(e));
                }
            };

            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16());

            if attempt < self.retries.max_retries && self.policy.should_retry(None, Some(status)) {
                let retry_after = response.headers().get(RETRY_AFTER).and_then(parse_retry_after);
                let delay = retry_delay(&self.retries, attempt, retry_after);
                warn!(
                    attempt,
                    status = status.as_u16(),
                    delay_ms = delay.as_millis() as u64,
                    "Rate limited, retrying"
                );
                metrics::record_retry();
                attempt += 1;
                cancellable_sleep(cancel, delay).await?;
                continue;
            }

            let text = run_cancellable(cancel, async {
                response.text().await.map_err(HlbError::Network)
            })
            .await?;

            return if status.is_success() {
                debug!(status = status.as_u16(), attempts = attempt + 1, "Request succeeded");
                trace!(body = %text, "Response body");
                Ok(text)
            } else {
                debug!(status = status.as_u16(), body = %text, "Request rejected");
                Err(error_from_response(status, &text))
            };
        }
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> HlbResult<T> {
    // Some mutations answer with an empty body.
    let body = if body.trim().is_empty() { "null" } else { body };
    Ok(serde_json::from_str(body)?)
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("base_url", &self.target.base_url)
            .field("region", &self.target.region)
            .field("max_retries", &self.retries.max_retries)
            .finish()
    }
}

