//! Credential cache manager.
//!
//! # Responsibilities
//! - Hand out a signed header that is unexpired and bound to the endpoint
//! - Regenerate and persist inline when the cached one is unusable
//! - Resolve the caller's account id once per (owner key, region)
//!
//! # Design Decisions
//! - One async mutex covers the whole load-check-regenerate-save sequence,
//!   so concurrent callers never generate twice for the same key
//! - A stored record for another account or endpoint is ignored

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::credentials::record::CredentialRecord;
use crate::credentials::signer::SignedHeaderGenerator;
use crate::credentials::store::CredentialStore;
use crate::error::HlbResult;
use crate::identity::IdentityService;
use crate::observability::metrics;

/// Validity of a freshly generated header.
pub const DEFAULT_VALIDITY_SECS: i64 = 15 * 60;

type CacheKey = (String, String);

/// Per-client cache of signed headers.
pub struct CredentialCache {
    store: CredentialStore,
    identity: Arc<dyn IdentityService>,
    generator: Arc<dyn SignedHeaderGenerator>,
    validity: Duration,
    entries: Mutex<HashMap<CacheKey, CredentialRecord>>,
}

impl CredentialCache {
    pub fn new(
        store: CredentialStore,
        identity: Arc<dyn IdentityService>,
        generator: Arc<dyn SignedHeaderGenerator>,
    ) -> Self {
        Self {
            store,
            identity,
            generator,
            validity: Duration::seconds(DEFAULT_VALIDITY_SECS),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Override the validity window of generated headers.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Currently valid signed header for `endpoint`.
    pub async fn get_header(&self, owner_key: &str, region: &str, endpoint: &str) -> HlbResult<String> {
        Ok(self.current(owner_key, region, endpoint).await?.header)
    }

    /// Account id the header for (`owner_key`, `region`) is bound to.
    pub async fn account_id(&self, owner_key: &str, region: &str, endpoint: &str) -> HlbResult<String> {
        Ok(self.current(owner_key, region, endpoint).await?.account_id)
    }

    async fn current(&self, owner_key: &str, region: &str, endpoint: &str) -> HlbResult<CredentialRecord> {
        let mut entries = self.entries.lock().await;
        let key = (owner_key.to_string(), region.to_string());
        let now = Utc::now();

        let account_id = match entries.get(&key).cloned() {
            Some(record) if record.is_usable_for(endpoint, now) => return Ok(record),
            Some(record) => {
                debug!(region = %region, expiry = %record.expiry, "Cached signed header unusable, regenerating");
                record.account_id
            }
            None => {
                let account_id = self.identity.caller_account_id().await?;
                match self.store.load(owner_key, region) {
                    Some(stored) if stored.account_id == account_id && stored.is_usable_for(endpoint, now) => {
                        debug!(region = %region, expiry = %stored.expiry, "Reusing persisted signed header");
                        entries.insert(key, stored.clone());
                        return Ok(stored);
                    }
                    Some(stored) if stored.account_id != account_id => {
                        warn!(region = %region, "Persisted signed header belongs to another account, ignoring");
                    }
                    _ => {}
                }
                account_id
            }
        };

        let record = self.regenerate(owner_key, region, endpoint, account_id).await?;
        entries.insert(key, record.clone());
        Ok(record)
    }

    async fn regenerate(
        &self,
        owner_key: &str,
        region: &str,
        endpoint: &str,
        account_id: String,
    ) -> HlbResult<CredentialRecord> {
        let generated_at = Utc::now().trunc_subsecs(3);
        let header = match self.generator.generate(&account_id, endpoint).await {
            Ok(header) => header,
            Err(e) => {
                metrics::record_credential_refresh("error");
                return Err(e);
            }
        };

        let record = CredentialRecord {
            owner_key: owner_key.to_string(),
            region: region.to_string(),
            header,
            expiry: generated_at + self.validity,
            account_id,
            endpoint: Some(endpoint.to_string()),
        };

        if let Err(e) = self.store.save(&record) {
            metrics::record_credential_refresh("error");
            return Err(e);
        }

        metrics::record_credential_refresh("success");
        info!(
            region = %region,
            account_id = %record.account_id,
            endpoint = %endpoint,
            expiry = %record.expiry,
            "Generated signed header"
        );
        Ok(record)
    }
}

impl std::fmt::Debug for CredentialCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("store", &self.store.path())
            .field("validity", &self.validity)
            .finish()
    }
}
