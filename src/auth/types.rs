//! Authentication user types.

use crate::jwt::{Claims, Identity};

/// Caller identity resolved from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// JWT claims from the access token
    pub claims: Claims,
}

impl AuthenticatedUser {
    /// User ID; scopes every per-user query.
    pub fn id(&self) -> i64 {
        self.claims.id
    }

    pub fn username(&self) -> &str {
        &self.claims.username
    }

    pub fn identity(&self) -> Identity {
        self.claims.identity()
    }
}
