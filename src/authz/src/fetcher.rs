//! Concurrent policy resolution for one authorization attempt
//!
//! A [`PolicyFetcher`] resolves a batch of [`PolicySource`]s against the shared
//! [`PolicyCache`]:
//!
//! ```text
//! sources ─┬─ skipped / added ───────────────────────────► PolicySet
//!          ├─ cache hit ─────────────────────────────────► PolicySet
//!          └─ miss ─► task per source ─► coordinator ─┬──► PolicySet + cache
//!                                                     └──► FailureReporter
//! ```
//!
//! Failed lookups are reported and omitted; they never fail the batch.

use futures::future::{self, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info_span, warn, Instrument};
use uuid::Uuid;

use crate::cache::PolicyCache;
use crate::context::CallContext;
use crate::error::{AuthzError, Result};
use crate::reporter::FailureReporter;
use crate::source::PolicySource;
use crate::types::{Policy, PolicySet, ResourceId};

type Completion = Shared<BoxFuture<'static, Arc<PolicySet>>>;

/// Collects sources, skipped resources and known policies before a fetch.
///
/// Obtained from [`Authorizer::fetcher`](crate::Authorizer::fetcher). Skipping
/// and adding policies is only possible here, before the fetcher exists, so
/// neither can race with a running resolution.
#[must_use]
pub struct PolicyFetcherBuilder {
    ctx: CallContext,
    cache: Arc<PolicyCache>,
    reporter: Arc<dyn FailureReporter>,
    enabled: bool,
    lookup_timeout: Option<Duration>,
    sources: Vec<PolicySource>,
    skip: HashSet<ResourceId>,
    added: HashMap<ResourceId, Arc<Policy>>,
}

impl PolicyFetcherBuilder {
    pub(crate) fn new(
        ctx: CallContext,
        cache: Arc<PolicyCache>,
        reporter: Arc<dyn FailureReporter>,
        enabled: bool,
        lookup_timeout: Option<Duration>,
        sources: Vec<PolicySource>,
    ) -> Self {
        Self {
            ctx,
            cache,
            reporter,
            enabled,
            lookup_timeout,
            sources,
            skip: HashSet::new(),
            added: HashMap::new(),
        }
    }

    /// Add another source to the batch
    pub fn source(mut self, source: PolicySource) -> Self {
        self.sources.push(source);
        self
    }

    /// Exclude resources from fetching; their getters are never invoked
    pub fn skip<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ResourceId>,
    {
        self.skip.extend(resources.into_iter().map(Into::into));
        self
    }

    /// Supply a policy obtained elsewhere. It goes straight into the result
    /// set and the shared cache, and the resource is not fetched.
    pub fn add_policy(mut self, resource: impl Into<ResourceId>, policy: impl Into<Arc<Policy>>) -> Self {
        self.added.insert(resource.into(), policy.into());
        self
    }

    /// Validate the batch and create the fetcher.
    ///
    /// Fails with [`AuthzError::DuplicateResource`] if a resource appears in
    /// more than one source.
    pub fn build(self) -> Result<PolicyFetcher> {
        let mut seen = HashSet::with_capacity(self.sources.len());
        for source in &self.sources {
            if !seen.insert(source.resource()) {
                return Err(AuthzError::DuplicateResource(source.resource().to_string()));
            }
        }

        let mut seeded = PolicySet::new();
        if self.enabled {
            for (resource, policy) in self.added {
                self.cache.store(resource.clone(), Arc::clone(&policy));
                seeded.insert(resource, policy);
            }
        }

        let sources: Vec<_> = self
            .sources
            .into_iter()
            .filter(|s| !self.skip.contains(s.resource()) && !seeded.contains(s.resource()))
            .collect();

        Ok(PolicyFetcher {
            id: Uuid::new_v4(),
            pending: Mutex::new(Some(Pending {
                ctx: self.ctx,
                cache: self.cache,
                reporter: self.reporter,
                enabled: self.enabled,
                lookup_timeout: self.lookup_timeout,
                sources,
                seeded,
            })),
            completion: OnceLock::new(),
        })
    }
}

/// Resolves a batch of policy sources exactly once.
///
/// [`run`](Self::run) starts resolution in the background;
/// [`policies`](Self::policies) starts it if needed and waits for the settled
/// set. Both must be called from within a Tokio runtime.
pub struct PolicyFetcher {
    id: Uuid,
    pending: Mutex<Option<Pending>>,
    completion: OnceLock<Completion>,
}

impl PolicyFetcher {
    /// Identifier carried by this fetcher's tracing span
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_started(&self) -> bool {
        self.completion.get().is_some()
    }

    /// Start resolution without waiting for it.
    ///
    /// Returns [`AuthzError::AlreadyStarted`] if resolution was already
    /// triggered, by `run` or by `policies`.
    pub fn run(&self) -> Result<()> {
        let mut triggered = false;
        self.completion.get_or_init(|| {
            triggered = true;
            self.start()
        });

        if triggered {
            Ok(())
        } else {
            warn!(fetch_id = %self.id, "policy fetch triggered twice");
            Err(AuthzError::AlreadyStarted)
        }
    }

    /// Wait for every lookup to settle and return the resolved policies.
    ///
    /// Starts resolution if nothing has yet. Later calls return the same set.
    pub async fn policies(&self) -> Arc<PolicySet> {
        self.completion.get_or_init(|| self.start()).clone().await
    }

    fn start(&self) -> Completion {
        let Some(pending) = self.pending.lock().take() else {
            // start runs inside the OnceLock initializer, so pending is always present
            return future::ready(Arc::new(PolicySet::new())).boxed().shared();
        };

        if !pending.enabled {
            debug!(fetch_id = %self.id, "authorization disabled, skipping policy fetch");
            return future::ready(Arc::new(PolicySet::new())).boxed().shared();
        }

        let span = info_span!(
            "policy_fetch",
            fetch_id = %self.id,
            sources = pending.sources.len(),
        );
        let coordinator = tokio::spawn(pending.resolve().instrument(span));

        let id = self.id;
        async move {
            match coordinator.await {
                Ok(set) => set,
                Err(err) => {
                    error!(fetch_id = %id, error = %err, "policy fetch coordinator failed");
                    Arc::new(PolicySet::new())
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl fmt::Debug for PolicyFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyFetcher")
            .field("id", &self.id)
            .field("started", &self.is_started())
            .finish()
    }
}

/// State moved into the coordinator task when resolution starts
struct Pending {
    ctx: CallContext,
    cache: Arc<PolicyCache>,
    reporter: Arc<dyn FailureReporter>,
    enabled: bool,
    lookup_timeout: Option<Duration>,
    sources: Vec<PolicySource>,
    seeded: PolicySet,
}

impl Pending {
    async fn resolve(self) -> Arc<PolicySet> {
        let Pending {
            ctx,
            cache,
            reporter,
            lookup_timeout,
            sources,
            seeded: mut results,
            ..
        } = self;

        let mut lookups = JoinSet::new();
        let mut cache_hits = 0usize;

        for source in sources {
            if let Some(policy) = cache.lookup(source.resource()) {
                debug!(resource = %source.resource(), "policy cache hit");
                results.insert(source.resource().to_string(), policy);
                cache_hits += 1;
                continue;
            }

            let ctx = match (ctx.deadline(), lookup_timeout) {
                (None, Some(timeout)) => ctx.clone().with_timeout(timeout),
                _ => ctx.clone(),
            };

            lookups.spawn(async move {
                let fetched = AssertUnwindSafe(ctx.run(source.fetch(&ctx)))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(AuthzError::Internal("policy getter panicked".to_string())));
                (source.resource().to_string(), fetched)
            });
        }

        let spawned = lookups.len();
        let mut failures = 0usize;

        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((resource, Ok(policy))) => {
                    let policy = cache.store(resource.clone(), Arc::new(policy));
                    results.insert(resource, policy);
                }
                Ok((resource, Err(err))) => {
                    failures += 1;
                    reporter.report(&resource, &err);
                }
                Err(err) => {
                    failures += 1;
                    error!(error = %err, "policy lookup task aborted");
                }
            }
        }

        debug!(
            resolved = results.len(),
            cache_hits,
            fetched = spawned - failures,
            failures,
            "policy fetch complete"
        );

        Arc::new(results)
    }
}
