use async_trait::async_trait;
use std::fmt;

use super::identity::IdentityContext;

/// Why a bearer credential did not yield an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer credential on the request.
    MissingCredential,
    /// The identity provider rejected the credential (signature, expiry, format).
    InvalidCredential(String),
    /// The credential verified but `user_id`, `email` or `role` is absent or not a string.
    MalformedClaims(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "missing bearer credential"),
            AuthError::InvalidCredential(msg) => write!(f, "invalid credential: {}", msg),
            AuthError::MalformedClaims(msg) => write!(f, "malformed claims: {}", msg),
        }
    }
}

impl std::error::Error for AuthError {}

/// Turns a bearer credential into a verified identity.
///
/// Implementations must be free of side effects so a call can be retried, and
/// must not cache results across requests.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: Option<&str>) -> Result<IdentityContext, AuthError>;
}
