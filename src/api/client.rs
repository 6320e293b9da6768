//! HLB API client facade.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::types::{
    Listener, ListenerCreate, ListenerUpdate, LoadBalancer, LoadBalancerCreate, LoadBalancerUpdate,
    Page,
};
use crate::config::loader::finalize_config;
use crate::config::{ClientConfig, ReconcileConfig};
use crate::credentials::{CredentialCache, CredentialStore, SignedHeaderGenerator, StsHeaderGenerator};
use crate::error::{HlbError, HlbResult};
use crate::identity::{resolve_base_credentials, IdentityService, StsClient};
use crate::reconcile::{Reconciler, ResourceReader, ResourceState};
use crate::transport::Transport;

/// Client for the HLB control plane.
///
/// Mutations return once the backend reports the resource settled, so a
/// returned load balancer is `active` and a delete has reached `deleted`.
pub struct HlbClient {
    transport: Transport,
    reconciler: Reconciler,
    timeouts: ReconcileConfig,
    account_id: String,
    region: String,
}

impl HlbClient {
    /// Client using base AWS credentials from the configured profile (or the
    /// environment and default chain) and the configured credential store.
    pub async fn connect(config: ClientConfig) -> HlbResult<Self> {
        let base = resolve_base_credentials(config.identity.profile.as_deref(), &config.region).await?;
        let identity: Arc<dyn IdentityService> = Arc::new(StsClient::new(&config, base)?);
        let store = CredentialStore::open(config.credentials.store_path.as_deref())?;
        let generator: Arc<dyn SignedHeaderGenerator> =
            Arc::new(StsHeaderGenerator::new(identity.clone(), &config));
        Self::with_parts(config, identity, generator, store).await
    }

    /// Client from explicit collaborators.
    ///
    /// Resolves the account id and warms the signed header before returning.
    pub async fn with_parts(
        config: ClientConfig,
        identity: Arc<dyn IdentityService>,
        generator: Arc<dyn SignedHeaderGenerator>,
        store: CredentialStore,
    ) -> HlbResult<Self> {
        let config = finalize_config(config).map_err(|e| HlbError::Config(e.to_string()))?;

        let validity = chrono::Duration::seconds(config.credentials.validity_secs as i64);
        let cache = Arc::new(CredentialCache::new(store, identity, generator).with_validity(validity));
        let transport = Transport::new(&config, cache.clone())?;

        let target = transport.target();
        let account_id = cache
            .account_id(&target.api_key, &target.region, &target.endpoint_host)
            .await?;

        info!(
            account_id = %account_id,
            region = %config.region,
            base_url = %target.base_url,
            "HLB client ready"
        );

        Ok(Self {
            transport,
            reconciler: Reconciler::from_config(&config.reconcile),
            timeouts: config.reconcile.clone(),
            account_id,
            region: config.region,
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn load_balancers_path(&self) -> String {
        format!("/aws_account/{}/load-balancers", self.account_id)
    }

    fn load_balancer_path(&self, id: &str) -> String {
        format!("{}/{}", self.load_balancers_path(), urlencoding::encode(id))
    }

    fn listeners_path(&self, load_balancer_id: &str) -> String {
        format!("{}/listeners", self.load_balancer_path(load_balancer_id))
    }

    fn listener_path(&self, load_balancer_id: &str, listener_id: &str) -> String {
        format!(
            "{}/{}",
            self.listeners_path(load_balancer_id),
            urlencoding::encode(listener_id)
        )
    }

    // Load balancers

    pub async fn list_load_balancers(
        &self,
        cancel: &CancellationToken,
        limit: Option<u32>,
        next_token: Option<&str>,
    ) -> HlbResult<Page<LoadBalancer>> {
        let path = paginated(self.load_balancers_path(), limit, next_token);
        self.transport.get(cancel, &path).await
    }

    /// Every load balancer, following `nextToken` to the end.
    pub async fn list_all_load_balancers(&self, cancel: &CancellationToken) -> HlbResult<Vec<LoadBalancer>> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .list_load_balancers(cancel, None, token.as_deref())
                .await?;
            token = page.next().map(str::to_string);
            items.extend(page.items);
            if token.is_none() {
                return Ok(items);
            }
        }
    }

    pub async fn get_load_balancer(&self, cancel: &CancellationToken, id: &str) -> HlbResult<LoadBalancer> {
        self.transport.get(cancel, &self.load_balancer_path(id)).await
    }

    /// Create a load balancer and wait until it is `active`.
    pub async fn create_load_balancer(
        &self,
        cancel: &CancellationToken,
        input: &LoadBalancerCreate,
    ) -> HlbResult<LoadBalancer> {
        let created: LoadBalancer = self
            .transport
            .post(cancel, &self.load_balancers_path(), input)
            .await?;
        info!(load_balancer_id = %created.id, state = %created.state, "Load balancer creation accepted");

        self.wait_for_load_balancer(
            cancel,
            &created.id,
            &[ResourceState::Active],
            self.timeouts.create_timeout(),
        )
        .await
    }

    /// Update a load balancer and wait until it is `active` again.
    pub async fn update_load_balancer(
        &self,
        cancel: &CancellationToken,
        id: &str,
        input: &LoadBalancerUpdate,
    ) -> HlbResult<LoadBalancer> {
        let updated: LoadBalancer = self
            .transport
            .put(cancel, &self.load_balancer_path(id), input)
            .await?;
        info!(load_balancer_id = %updated.id, state = %updated.state, "Load balancer update accepted");

        self.wait_for_load_balancer(
            cancel,
            &updated.id,
            &[ResourceState::Active],
            self.timeouts.update_timeout(),
        )
        .await
    }

    /// Delete a load balancer and wait until it is `deleted`.
    pub async fn delete_load_balancer(&self, cancel: &CancellationToken, id: &str) -> HlbResult<()> {
        self.transport.delete(cancel, &self.load_balancer_path(id)).await?;
        info!(load_balancer_id = %id, "Load balancer deletion accepted");

        self.wait_for_load_balancer(
            cancel,
            id,
            &[ResourceState::Deleted],
            self.timeouts.delete_timeout(),
        )
        .await
        .map(|_| ())
    }

    /// Poll a load balancer until it reaches one of `targets`.
    pub async fn wait_for_load_balancer(
        &self,
        cancel: &CancellationToken,
        id: &str,
        targets: &[ResourceState],
        timeout: Duration,
    ) -> HlbResult<LoadBalancer> {
        let reader = LoadBalancerReader { client: self };
        self.reconciler
            .await_state(cancel, &reader, id, targets, timeout)
            .await
    }

    // Listeners

    pub async fn list_listeners(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        limit: Option<u32>,
        next_token: Option<&str>,
    ) -> HlbResult<Page<Listener>> {
        let path = paginated(self.listeners_path(load_balancer_id), limit, next_token);
        self.transport.get(cancel, &path).await
    }

    /// Every listener of a load balancer, following `nextToken` to the end.
    pub async fn list_all_listeners(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
    ) -> HlbResult<Vec<Listener>> {
        let mut items = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self
                .list_listeners(cancel, load_balancer_id, None, token.as_deref())
                .await?;
            token = page.next().map(str::to_string);
            items.extend(page.items);
            if token.is_none() {
                return Ok(items);
            }
        }
    }

    pub async fn get_listener(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        listener_id: &str,
    ) -> HlbResult<Listener> {
        self.transport
            .get(cancel, &self.listener_path(load_balancer_id, listener_id))
            .await
    }

    /// Create a listener. Waits for `active` only when the service reports
    /// listener state.
    pub async fn create_listener(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        input: &ListenerCreate,
    ) -> HlbResult<Listener> {
        let created: Listener = self
            .transport
            .post(cancel, &self.listeners_path(load_balancer_id), input)
            .await?;
        info!(load_balancer_id = %load_balancer_id, listener_id = %created.id, "Listener created");

        self.settle_listener(cancel, load_balancer_id, created, self.timeouts.create_timeout())
            .await
    }

    /// Update a listener. Waits for `active` only when the service reports
    /// listener state.
    pub async fn update_listener(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        listener_id: &str,
        input: &ListenerUpdate,
    ) -> HlbResult<Listener> {
        let updated: Listener = self
            .transport
            .put(cancel, &self.listener_path(load_balancer_id, listener_id), input)
            .await?;
        info!(load_balancer_id = %load_balancer_id, listener_id = %updated.id, "Listener updated");

        self.settle_listener(cancel, load_balancer_id, updated, self.timeouts.update_timeout())
            .await
    }

    /// Delete a listener. Returns once the service accepts the request.
    pub async fn delete_listener(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        listener_id: &str,
    ) -> HlbResult<()> {
        self.transport
            .delete(cancel, &self.listener_path(load_balancer_id, listener_id))
            .await?;
        info!(load_balancer_id = %load_balancer_id, listener_id = %listener_id, "Listener deleted");
        Ok(())
    }

    async fn settle_listener(
        &self,
        cancel: &CancellationToken,
        load_balancer_id: &str,
        listener: Listener,
        timeout: Duration,
    ) -> HlbResult<Listener> {
        match &listener.state {
            None | Some(ResourceState::Active) => Ok(listener),
            Some(_) => {
                let reader = ListenerReader {
                    client: self,
                    load_balancer_id,
                };
                self.reconciler
                    .await_state(cancel, &reader, &listener.id, &[ResourceState::Active], timeout)
                    .await
            }
        }
    }
}

impl std::fmt::Debug for HlbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HlbClient")
            .field("account_id", &self.account_id)
            .field("region", &self.region)
            .field("transport", &self.transport)
            .finish()
    }
}

fn paginated(path: String, limit: Option<u32>, next_token: Option<&str>) -> String {
    let mut query = Vec::new();
    if let Some(limit) = limit {
        query.push(format!("limit={}", limit));
    }
    if let Some(token) = next_token.filter(|t| !t.is_empty()) {
        query.push(format!("nextToken={}", urlencoding::encode(token)));
    }
    if query.is_empty() {
        path
    } else {
        format!("{}?{}", path, query.join("&"))
    }
}

struct LoadBalancerReader<'a> {
    client: &'a HlbClient,
}

#[async_trait]
impl<'a> ResourceReader for LoadBalancerReader<'a> {
    type Resource = LoadBalancer;

    fn kind(&self) -> &'static str {
        "load balancer"
    }

    async fn read(&self, cancel: &CancellationToken, id: &str) -> HlbResult<LoadBalancer> {
        self.client.get_load_balancer(cancel, id).await
    }
}

struct ListenerReader<'a> {
    client: &'a HlbClient,
    load_balancer_id: &'a str,
}

#[async_trait]
impl<'a> ResourceReader for ListenerReader<'a> {
    type Resource = Listener;

    fn kind(&self) -> &'static str {
        "listener"
    }

    async fn read(&self, cancel: &CancellationToken, id: &str) -> HlbResult<Listener> {
        self.client
            .get_listener(cancel, self.load_balancer_id, id)
            .await
    }
}
