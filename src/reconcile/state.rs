//! Resource lifecycle states as reported by the backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-reported state of a load balancer or listener.
///
/// Unrecognised wire values are kept in `Unknown` so they surface in
/// errors verbatim instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceState {
    PendingCreation,
    Creating,
    Active,
    PendingUpdate,
    Updating,
    PendingDeletion,
    Deleting,
    Deleted,
    Failed,
    Unknown(String),
}

/// How the reconciler treats a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// Server-side work in progress; poll again.
    Transitional,
    /// Settled; success when it is in the target set.
    Settled,
    /// The operation failed.
    Failed,
    /// Outside the known progression.
    Unexpected,
}

impl ResourceState {
    pub fn as_str(&self) -> &str {
        match self {
            ResourceState::PendingCreation => "pending_creation",
            ResourceState::Creating => "creating",
            ResourceState::Active => "active",
            ResourceState::PendingUpdate => "pending_update",
            ResourceState::Updating => "updating",
            ResourceState::PendingDeletion => "pending_delete",
            ResourceState::Deleting => "deleting",
            ResourceState::Deleted => "deleted",
            ResourceState::Failed => "failed",
            ResourceState::Unknown(raw) => raw,
        }
    }

    pub fn classify(&self) -> StateClass {
        match self {
            ResourceState::PendingCreation
            | ResourceState::Creating
            | ResourceState::PendingUpdate
            | ResourceState::Updating
            | ResourceState::PendingDeletion
            | ResourceState::Deleting => StateClass::Transitional,
            ResourceState::Active | ResourceState::Deleted => StateClass::Settled,
            ResourceState::Failed => StateClass::Failed,
            ResourceState::Unknown(_) => StateClass::Unexpected,
        }
    }
}

impl From<&str> for ResourceState {
    fn from(raw: &str) -> Self {
        match raw {
            "pending_creation" => ResourceState::PendingCreation,
            "creating" => ResourceState::Creating,
            "active" => ResourceState::Active,
            "pending_update" => ResourceState::PendingUpdate,
            "updating" => ResourceState::Updating,
            "pending_delete" => ResourceState::PendingDeletion,
            "deleting" => ResourceState::Deleting,
            "deleted" => ResourceState::Deleted,
            "failed" => ResourceState::Failed,
            other => ResourceState::Unknown(other.to_string()),
        }
    }
}

impl From<String> for ResourceState {
    fn from(raw: String) -> Self {
        ResourceState::from(raw.as_str())
    }
}

impl From<ResourceState> for String {
    fn from(state: ResourceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
