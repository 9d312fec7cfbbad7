//! Reporting of failed policy lookups

use tracing::warn;

use crate::error::AuthzError;

/// Receives every failed lookup. Failures never reach the fetch result.
pub trait FailureReporter: Send + Sync {
    fn report(&self, resource: &str, error: &AuthzError);
}

/// Emits each failure as a structured `tracing` warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, resource: &str, error: &AuthzError) {
        warn!(resource = %resource, error = %error, kind = ?error.kind(), "policy lookup failed");
    }
}
