//! Permission-denied responses for the policy evaluation layer

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AuthzError;

/// Structured denial: which method was attempted, on what, and which roles
/// would have satisfied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Denial {
    /// Fully qualified method name
    pub method: String,

    /// Resource the method was invoked on
    pub resource: String,

    /// Roles any one of which grants access; empty for internal-only methods
    #[serde(default)]
    pub required_roles: Vec<String>,
}

impl Denial {
    /// Methods without any granting role can never be called externally
    pub fn is_internal_only(&self) -> bool {
        self.required_roles.is_empty()
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_internal_only() {
            return write!(f, "method {} is internal only", self.method);
        }

        write!(
            f,
            "caller lacks any of the roles [{}] required for {} on {}",
            self.required_roles.join(", "),
            self.method,
            self.resource
        )
    }
}

/// Build the permission-denied error for `method` on `resource`.
pub fn permission_denied<S: AsRef<str>>(method: &str, resource: &str, roles: &[S]) -> AuthzError {
    AuthzError::PermissionDenied(Denial {
        method: method.to_string(),
        resource: resource.to_string(),
        required_roles: roles.iter().map(|r| r.as_ref().to_string()).collect(),
    })
}
