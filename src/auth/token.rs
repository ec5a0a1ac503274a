use async_trait::async_trait;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::identity::{IdentityContext, Role};
use super::verifier::{AuthError, IdentityVerifier};
use crate::error::AppError;

/// Claim names carried by provider-issued tokens.
pub const CLAIM_USER_ID: &str = "user_id";
pub const CLAIM_EMAIL: &str = "email";
pub const CLAIM_ROLE: &str = "role";

/// The claims written by `issue_token`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject of the token, the user's unique identifier.
    pub user_id: String,
    pub email: String,
    pub role: Role,
    /// Expiration timestamp (seconds since epoch).
    pub exp: usize,
}

/// Verifies HS256 tokens signed with a shared secret.
///
/// Default validation applies: signature, algorithm and a required, unexpired `exp`.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Synchronous core of `verify`, for a credential already known to be present.
    pub fn decode_identity(&self, token: &str) -> Result<IdentityContext, AuthError> {
        let claims = decode::<HashMap<String, Value>>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidCredential(e.to_string()))?;
        identity_from_claims(&claims)
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: Option<&str>) -> Result<IdentityContext, AuthError> {
        match credential.map(str::trim) {
            Some(token) if !token.is_empty() => self.decode_identity(token),
            _ => Err(AuthError::MissingCredential),
        }
    }
}

fn string_claim<'a>(claims: &'a HashMap<String, Value>, name: &str) -> Result<&'a str, AuthError> {
    claims
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| AuthError::MalformedClaims(format!("`{}` is missing or not a string", name)))
}

/// Maps verified claims onto an identity. Unknown roles count as malformed.
pub fn identity_from_claims(claims: &HashMap<String, Value>) -> Result<IdentityContext, AuthError> {
    let subject_id = string_claim(claims, CLAIM_USER_ID)?;
    let email = string_claim(claims, CLAIM_EMAIL)?;
    let role = string_claim(claims, CLAIM_ROLE)?
        .parse::<Role>()
        .map_err(AuthError::MalformedClaims)?;
    Ok(IdentityContext::new(subject_id, email, role))
}

/// Signs a token for `identity` that expires after `ttl`.
///
/// Tokens normally come from the identity provider; this mirrors their shape
/// for local development and tests.
pub fn issue_token(
    secret: &str,
    identity: &IdentityContext,
    ttl: chrono::Duration,
) -> Result<String, AppError> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| AppError::InvalidArgument("token lifetime out of range".into()))?
        .timestamp()
        .max(0) as usize;

    let claims = Claims {
        user_id: identity.subject_id.clone(),
        email: identity.email.clone(),
        role: identity.role,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}
