//! HLB API data contracts.
//!
//! Field names follow the service's camelCase JSON. Response types accept
//! missing fields so older or newer service versions still decode.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::reconcile::{Observed, ResourceState};

fn unreported_state() -> ResourceState {
    ResourceState::Unknown("unreported".to_string())
}

/// Access log shipping settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessLogs {
    pub bucket: String,
    pub enabled: bool,
    pub prefix: String,
}

/// Fleet sizing for the load balancer's instances.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LaunchConfig {
    pub instance_type: String,
    pub min_instance_count: u32,
    pub max_instance_count: u32,
    #[serde(rename = "targetCpuUsage")]
    pub target_cpu_usage: u32,
}

/// Outcome of the latest deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Base64 payload, opaque to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A managed load balancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "unreported_state")]
    pub state: ResourceState,
    #[serde(default)]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_logs: Option<AccessLogs>,
    #[serde(default)]
    pub client_keep_alive: u32,
    #[serde(default)]
    pub connection_draining_timeout: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<DeploymentStatus>,
    #[serde(default, rename = "dnsName")]
    pub dns_name: String,
    #[serde(default)]
    pub ec2_iam_role: String,
    #[serde(default)]
    pub enable_cross_zone_load_balancing: String,
    #[serde(default)]
    pub enable_deletion_protection: bool,
    #[serde(default)]
    pub enable_http2: bool,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub idle_timeout: u32,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, rename = "ipAddressType")]
    pub ip_address_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<LaunchConfig>,
    #[serde(default)]
    pub preferred_maintenance_window: String,
    #[serde(default)]
    pub preserve_host_header: bool,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub xff_header_processing_mode: String,
    #[serde(default, rename = "zoneId")]
    pub zone_id: String,
    #[serde(default)]
    pub zone_name: String,
}

impl Observed for LoadBalancer {
    fn state(&self) -> ResourceState {
        self.state.clone()
    }

    fn failure_detail(&self) -> Option<String> {
        self.deployment_status
            .as_ref()
            .and_then(|status| status.error_message.clone())
    }
}

/// Body of `POST /load-balancers`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_logs: Option<AccessLogs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_keep_alive: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_draining_timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ec2_iam_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_cross_zone_load_balancing: Option<String>,
    #[serde(default)]
    pub enable_deletion_protection: bool,
    #[serde(default)]
    pub enable_http2: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u32>,
    #[serde(default)]
    pub internal: bool,
    #[serde(default, rename = "ipAddressType", skip_serializing_if = "Option::is_none")]
    pub ip_address_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<LaunchConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_maintenance_window: Option<String>,
    #[serde(default)]
    pub preserve_host_header: bool,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xff_header_processing_mode: Option<String>,
    #[serde(default, rename = "zoneId", skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
}

/// Body of `PUT /load-balancers/{id}`. Unset fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoadBalancerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_logs: Option<AccessLogs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_keep_alive: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_draining_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ec2_iam_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cross_zone_load_balancing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_deletion_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_http2: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub launch_config: Option<LaunchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_maintenance_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_host_header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_groups: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xff_header_processing_mode: Option<String>,
}

/// A listener attached to a load balancer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listener {
    pub id: String,
    #[serde(default)]
    pub load_balancer_id: String,
    /// Only reported by service versions that deploy listeners asynchronously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ResourceState>,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub protocol: String,
    #[serde(default, rename = "targetGroupArn")]
    pub target_group_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_secrets_name: Option<String>,
    #[serde(default)]
    pub enable_deletion_protection: bool,
    #[serde(default)]
    pub overprovisioning_factor: f64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub uri: String,
}

impl Observed for Listener {
    fn state(&self) -> ResourceState {
        self.state.clone().unwrap_or_else(unreported_state)
    }
}

/// Body of `POST /listeners`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerCreate {
    pub port: u16,
    pub protocol: String,
    #[serde(rename = "targetGroupArn")]
    pub target_group_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpn_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_secrets_name: Option<String>,
    #[serde(default)]
    pub enable_deletion_protection: bool,
    #[serde(default)]
    pub overprovisioning_factor: f64,
}

/// Body of `PUT /listeners/{id}`. Unset fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListenerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(rename = "targetGroupArn", skip_serializing_if = "Option::is_none")]
    pub target_group_arn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_secrets_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_deletion_protection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overprovisioning_factor: Option<f64>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// Token for the following page; an empty token means there is none.
    pub fn next(&self) -> Option<&str> {
        self.next_token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_balancer_decodes_service_json() {
        let lb: LoadBalancer = serde_json::from_str(
            r#"{
                "id": "lb-123",
                "name": "web",
                "state": "failed",
                "accountId": "123456789012",
                "dnsName": "web.hlb.example",
                "deploymentStatus": {"errorMessage": "quota exceeded"},
                "launchConfig": {"instanceType": "t4g.small", "minInstanceCount": 1, "maxInstanceCount": 3, "targetCpuUsage": 60},
                "subnets": ["subnet-a", "subnet-b"],
                "tags": {"env": "prod"},
                "createdAt": "2026-10-16T10:00:00Z",
                "somethingNew": true
            }"#,
        )
        .unwrap();

        assert_eq!(lb.state, ResourceState::Failed);
        assert_eq!(lb.failure_detail().as_deref(), Some("quota exceeded"));
        assert_eq!(lb.launch_config.unwrap().target_cpu_usage, 60);
        assert_eq!(lb.tags["env"], "prod");
        assert!(lb.created_at.is_some());
    }

    #[test]
    fn test_update_only_sends_set_fields() {
        let update = LoadBalancerUpdate {
            idle_timeout: Some(120),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"idleTimeout":120}"#);
    }

    #[test]
    fn test_listener_state_is_optional() {
        let listener: Listener =
            serde_json::from_str(r#"{"id": "l-1", "port": 443, "protocol": "HTTPS"}"#).unwrap();
        assert!(listener.state.is_none());
        assert_eq!(listener.state().classify(), crate::reconcile::StateClass::Unexpected);

        let listener: Listener =
            serde_json::from_str(r#"{"id": "l-1", "state": "pending_creation"}"#).unwrap();
        assert_eq!(listener.state, Some(ResourceState::PendingCreation));
    }

    #[test]
    fn test_page_next_token() {
        let page: Page<Listener> = serde_json::from_str(r#"{"items": [], "nextToken": ""}"#).unwrap();
        assert_eq!(page.next(), None);

        let page: Page<Listener> = serde_json::from_str(r#"{"items": [], "nextToken": "abc"}"#).unwrap();
        assert_eq!(page.next(), Some("abc"));

        let page: Page<Listener> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(page.items.is_empty());
    }
}
