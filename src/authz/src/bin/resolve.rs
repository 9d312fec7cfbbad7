//! # Policy Resolve
//!
//! Resolves the policies for a set of resources from a JSON policy file and
//! prints the settled set as JSON.
//!
//! ```text
//! policy-resolve <policies.json> <resource>...
//! ```
//!
//! The policy file maps resource names to policies.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `AUTHZ_DISABLED` - Turn enforcement off (default: false)
//! - `AUTHZ_LOOKUP_TIMEOUT_MS` - Per-lookup deadline (default: none)
//! - `RUST_LOG` - Log level (default: info)

use anyhow::{bail, Context};
use cretoai_policy_resolver::{
    Authorizer, AuthzConfig, CallContext, InMemoryPolicyHandler, Policy, PolicySource, ResourceId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!("usage: policy-resolve <policies.json> <resource>...");
    };
    let resources: Vec<String> = args.collect();
    if resources.is_empty() {
        bail!("no resources given");
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path))?;
    let policies: HashMap<ResourceId, Policy> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))?;

    info!("Policy Resolve v{}", cretoai_policy_resolver::VERSION);
    info!("Loaded {} policies from {}", policies.len(), path);

    let config = AuthzConfig::from_env()?;
    let authorizer = Authorizer::new(config);
    let handler = Arc::new(InMemoryPolicyHandler::with_policies(policies));

    let sources = resources
        .iter()
        .map(|r| PolicySource::local(r.as_str(), handler.clone()))
        .collect();

    // Ctrl+C cancels outstanding lookups
    let ctx = CallContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling lookups");
            interrupt.cancel();
        }
    });

    let fetcher = authorizer.fetcher(ctx, sources).build()?;
    let resolved = fetcher.policies().await;

    for resource in &resources {
        if !resolved.contains(resource) {
            warn!(resource = %resource, "no policy resolved");
        }
    }

    let output: BTreeMap<&str, &Policy> = resolved.iter().map(|(r, p)| (r, p.as_ref())).collect();
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
