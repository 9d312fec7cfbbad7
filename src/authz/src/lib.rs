//! # CretoAI Policy Resolver
//!
//! Gathers the access-control policies for every resource an operation
//! touches, so a policy evaluator can make one authorization decision.
//!
//! ## Features
//!
//! - **Concurrent lookups**: one Tokio task per uncached resource
//! - **Shared cache** per authorization context, first-writer-wins
//! - **Skip and inject**: exclude resources or supply policies already known
//! - **Contained failures**: failed lookups are reported and omitted
//! - **Structured denials** for the evaluation layer
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use cretoai_policy_resolver::{
//!     Authorizer, AuthzConfig, CallContext, InMemoryPolicyHandler, Policy, PolicySource,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let handler = Arc::new(InMemoryPolicyHandler::new());
//!     handler.put("projects/p1/topics/t1", Policy::new()).await;
//!
//!     let authorizer = Authorizer::new(AuthzConfig::default());
//!     let fetcher = authorizer
//!         .fetcher(
//!             CallContext::new(),
//!             vec![PolicySource::local("projects/p1/topics/t1", handler.clone())],
//!         )
//!         .build()?;
//!
//!     let policies = fetcher.policies().await;
//!     assert!(policies.contains("projects/p1/topics/t1"));
//!
//!     Ok(())
//! }
//! ```

pub mod authorizer;
pub mod cache;
pub mod config;
pub mod context;
pub mod denial;
pub mod error;
pub mod fetcher;
pub mod reporter;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use authorizer::Authorizer;
pub use cache::{CacheStats, PolicyCache};
pub use config::AuthzConfig;
pub use context::CallContext;
pub use denial::{permission_denied, Denial};
pub use error::{AuthzError, ErrorKind, Result};
pub use fetcher::{PolicyFetcher, PolicyFetcherBuilder};
pub use reporter::{FailureReporter, TracingReporter};
pub use source::{InMemoryPolicyHandler, LocalPolicyHandler, PolicySource, PolicyTransport};
pub use types::{Binding, Policy, PolicySet, ResourceId, RoleId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
