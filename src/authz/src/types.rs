//! Core policy types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Resource identifier (e.g. "projects/p1/topics/t1")
pub type ResourceId = String;

/// Role identifier (e.g. "roles/viewer")
pub type RoleId = String;

/// Grant of one role to a set of members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Role being granted
    pub role: RoleId,

    /// Members holding the role (e.g. "user:alice@example.com")
    #[serde(default)]
    pub members: Vec<String>,
}

impl Binding {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.members.push(member.into());
        self
    }
}

/// Access grants for one resource, as issued by the policy authority.
///
/// Policies are immutable once retrieved and shared as `Arc<Policy>` between
/// the cache, fetch results and callers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy format version
    #[serde(default)]
    pub version: u32,

    /// Role bindings
    #[serde(default)]
    pub bindings: Vec<Binding>,

    /// Opaque revision tag from the authority
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etag: String,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = etag.into();
        self
    }

    /// Roles bound in this policy, in binding order
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.role.as_str())
    }
}

/// Settled result of a policy fetch: at most one policy per resource, no
/// ordering guarantees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicySet {
    policies: HashMap<ResourceId, Arc<Policy>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, resource: ResourceId, policy: Arc<Policy>) {
        self.policies.insert(resource, policy);
    }

    pub fn get(&self, resource: &str) -> Option<&Arc<Policy>> {
        self.policies.get(resource)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.policies.contains_key(resource)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn resources(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Policy>)> {
        self.policies.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_roles() {
        let policy = Policy::new()
            .with_binding(Binding::new("roles/viewer").with_member("user:alice@example.com"))
            .with_binding(Binding::new("roles/editor"))
            .with_etag("BwX1");

        let roles: Vec<_> = policy.roles().collect();
        assert_eq!(roles, vec!["roles/viewer", "roles/editor"]);
        assert_eq!(policy.bindings[0].members.len(), 1);
    }

    #[test]
    fn test_policy_deserialize_defaults() {
        let policy: Policy =
            serde_json::from_str(r#"{"bindings":[{"role":"roles/owner"}]}"#).unwrap();

        assert_eq!(policy.version, 0);
        assert!(policy.etag.is_empty());
        assert!(policy.bindings[0].members.is_empty());
    }

    #[test]
    fn test_policy_set_lookup() {
        let mut set = PolicySet::new();
        set.insert("docs/d1".to_string(), Arc::new(Policy::new()));

        assert!(set.contains("docs/d1"));
        assert!(set.get("docs/d2").is_none());
        assert_eq!(set.resources().collect::<Vec<_>>(), vec!["docs/d1"]);
    }
}
