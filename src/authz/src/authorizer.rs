//! Authorization context: owns the policy cache shared by its fetchers

use std::sync::Arc;
use tracing::info;

use crate::cache::{CacheStats, PolicyCache};
use crate::config::AuthzConfig;
use crate::context::CallContext;
use crate::error::Result;
use crate::fetcher::PolicyFetcherBuilder;
use crate::reporter::{FailureReporter, TracingReporter};
use crate::source::PolicySource;

/// Authorization context
///
/// Every fetcher created from the same `Authorizer` shares its cache, so a
/// resource fetched once is served from memory for the rest of the
/// context's lifetime.
#[derive(Clone)]
pub struct Authorizer {
    cache: Arc<PolicyCache>,
    config: AuthzConfig,
    reporter: Arc<dyn FailureReporter>,
}

impl Authorizer {
    /// Create a context with a fresh cache and tracing-based failure reporting
    pub fn new(config: AuthzConfig) -> Self {
        info!(
            enabled = config.enabled,
            lookup_timeout = ?config.lookup_timeout,
            "Authorizer initialized"
        );

        Self {
            cache: Arc::new(PolicyCache::new()),
            config,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Create a context configured from the environment
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(AuthzConfig::from_env()?))
    }

    /// Use an existing cache instead of a fresh one
    pub fn with_cache(mut self, cache: Arc<PolicyCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Route lookup failures to `reporter`
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<PolicyCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Start building a fetcher for `sources` under `ctx`
    pub fn fetcher(&self, ctx: CallContext, sources: Vec<PolicySource>) -> PolicyFetcherBuilder {
        PolicyFetcherBuilder::new(
            ctx,
            Arc::clone(&self.cache),
            Arc::clone(&self.reporter),
            self.config.enabled,
            self.config.lookup_timeout,
            sources,
        )
    }
}

impl Default for Authorizer {
    fn default() -> Self {
        Self::new(AuthzConfig::default())
    }
}
