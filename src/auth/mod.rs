//! Request authentication: bearer credential in, `IdentityContext` out.
//!
//! `AuthMiddleware` runs a pluggable `IdentityVerifier` (JWT by default) in
//! front of every handler in its scope. Handlers pick the identity up with the
//! `Authenticated` extractor and pass it explicitly to the services, which make
//! the per-resource role decisions.

pub mod directory;
pub mod extractors;
pub mod identity;
pub mod middleware;
pub mod token;
pub mod verifier;

pub use directory::{IdentityDirectory, MemoryDirectory};
pub use extractors::Authenticated;
pub use identity::{IdentityContext, Role};
pub use middleware::AuthMiddleware;
pub use token::{issue_token, Claims, JwtVerifier};
pub use verifier::{AuthError, IdentityVerifier};
