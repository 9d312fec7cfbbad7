//! Policy sources: a resource bound to the capability that retrieves its policy

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::context::CallContext;
use crate::error::{AuthzError, Result};
use crate::types::{Policy, ResourceId};

/// Call to a remote policy authority
#[async_trait]
pub trait PolicyTransport: Send + Sync {
    /// Fetch the policy for `resource` from the authority
    async fn get_policy(&self, ctx: &CallContext, resource: &str) -> Result<Policy>;
}

/// In-process policy lookup, e.g. reading a resource's policy alongside its data
#[async_trait]
pub trait LocalPolicyHandler: Send + Sync {
    /// Look up the policy for `resource`
    async fn policy_for(&self, ctx: &CallContext, resource: &str) -> Result<Policy>;
}

#[derive(Clone)]
enum Origin {
    Remote(Arc<dyn PolicyTransport>),
    Local(Arc<dyn LocalPolicyHandler>),
}

/// A resource paired with the way its policy is obtained.
///
/// Construction does no I/O; the retrieval runs only when [`fetch`](Self::fetch)
/// is called.
#[derive(Clone)]
pub struct PolicySource {
    resource: ResourceId,
    origin: Origin,
}

impl PolicySource {
    /// Source backed by a remote policy authority
    pub fn remote(resource: impl Into<ResourceId>, transport: Arc<dyn PolicyTransport>) -> Self {
        Self {
            resource: resource.into(),
            origin: Origin::Remote(transport),
        }
    }

    /// Source backed by an in-process handler
    pub fn local(resource: impl Into<ResourceId>, handler: Arc<dyn LocalPolicyHandler>) -> Self {
        Self {
            resource: resource.into(),
            origin: Origin::Local(handler),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.origin, Origin::Remote(_))
    }

    /// Retrieve the policy
    pub async fn fetch(&self, ctx: &CallContext) -> Result<Policy> {
        match &self.origin {
            Origin::Remote(transport) => transport.get_policy(ctx, &self.resource).await,
            Origin::Local(handler) => handler.policy_for(ctx, &self.resource).await,
        }
    }
}

impl fmt::Debug for PolicySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicySource")
            .field("resource", &self.resource)
            .field("origin", &if self.is_remote() { "remote" } else { "local" })
            .finish()
    }
}

/// In-memory local handler
pub struct InMemoryPolicyHandler {
    policies: Arc<RwLock<HashMap<ResourceId, Policy>>>,
}

impl InMemoryPolicyHandler {
    pub fn new() -> Self {
        Self {
            policies: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Handler preloaded with `policies`
    pub fn with_policies(policies: HashMap<ResourceId, Policy>) -> Self {
        Self {
            policies: Arc::new(RwLock::new(policies)),
        }
    }

    pub async fn put(&self, resource: impl Into<ResourceId>, policy: Policy) {
        let mut policies = self.policies.write().await;
        policies.insert(resource.into(), policy);
    }

    pub async fn remove(&self, resource: &str) -> Option<Policy> {
        let mut policies = self.policies.write().await;
        policies.remove(resource)
    }

    pub async fn len(&self) -> usize {
        self.policies.read().await.len()
    }
}

impl Default for InMemoryPolicyHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalPolicyHandler for InMemoryPolicyHandler {
    async fn policy_for(&self, _ctx: &CallContext, resource: &str) -> Result<Policy> {
        let policies = self.policies.read().await;
        policies
            .get(resource)
            .cloned()
            .ok_or_else(|| AuthzError::PolicyNotFound(resource.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Binding;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PolicyTransport for CountingTransport {
        async fn get_policy(&self, _ctx: &CallContext, resource: &str) -> Result<Policy> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Policy::new().with_etag(resource))
        }
    }

    #[tokio::test]
    async fn test_remote_source_is_lazy() {
        let transport = Arc::new(CountingTransport {
            calls: AtomicUsize::new(0),
        });
        let source = PolicySource::remote("topics/t1", transport.clone());

        assert!(source.is_remote());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        let policy = source.fetch(&CallContext::new()).await.unwrap();
        assert_eq!(policy.etag, "topics/t1");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_local_source() {
        let handler = Arc::new(InMemoryPolicyHandler::new());
        handler
            .put("docs/d1", Policy::new().with_binding(Binding::new("roles/viewer")))
            .await;

        let found = PolicySource::local("docs/d1", handler.clone());
        let missing = PolicySource::local("docs/d2", handler.clone());
        let ctx = CallContext::new();

        assert!(!found.is_remote());
        assert_eq!(found.fetch(&ctx).await.unwrap().bindings.len(), 1);
        assert!(matches!(
            missing.fetch(&ctx).await,
            Err(AuthzError::PolicyNotFound(r)) if r == "docs/d2"
        ));
    }

    #[tokio::test]
    async fn test_in_memory_remove() {
        let handler = InMemoryPolicyHandler::new();
        handler.put("docs/d1", Policy::new()).await;
        assert_eq!(handler.len().await, 1);

        assert!(handler.remove("docs/d1").await.is_some());
        assert_eq!(handler.len().await, 0);
    }
}
