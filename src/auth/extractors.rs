use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use log::error;
use std::future::{ready, Ready};

use super::identity::IdentityContext;
use crate::error::AppError;

/// Extracts the verified identity from request extensions.
///
/// Only valid on routes wrapped by `AuthMiddleware`. A missing identity means
/// the middleware is not mounted, which is a wiring bug rather than a client
/// error, so it surfaces as `Internal`.
#[derive(Debug, Clone)]
pub struct Authenticated(pub IdentityContext);

impl FromRequest for Authenticated {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<IdentityContext>().cloned() {
            Some(identity) => ready(Ok(Authenticated(identity))),
            None => {
                error!(
                    "no identity attached to {} {}; is AuthMiddleware mounted?",
                    req.method(),
                    req.path()
                );
                let err = AppError::Internal("identity context missing".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
