use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::{debug, warn};
use std::rc::Rc;
use std::sync::Arc;

use super::verifier::IdentityVerifier;
use crate::error::AppError;

/// Verifies the bearer credential of every request in the wrapped scope and
/// attaches the resulting `IdentityContext` to the request extensions.
///
/// There is no bypass list: anything that must stay public is mounted outside
/// the wrapped scope. Rejected requests never reach the handler.
#[derive(Clone)]
pub struct AuthMiddleware {
    verifier: Arc<dyn IdentityVerifier>,
}

impl AuthMiddleware {
    pub fn new(verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            verifier: Arc::clone(&self.verifier),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    verifier: Arc<dyn IdentityVerifier>,
}

/// The token from an `Authorization: Bearer <token>` header. The scheme is
/// matched case-insensitively; any other scheme counts as no credential.
pub fn bearer_credential(req: &ServiceRequest) -> Option<String> {
    let value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        Some(token.trim().to_string())
    } else {
        None
    }
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let verifier = Arc::clone(&self.verifier);
        let credential = bearer_credential(&req);

        Box::pin(async move {
            match verifier.verify(credential.as_deref()).await {
                Ok(identity) => {
                    debug!(
                        "authorized {} ({}) for {} {}",
                        identity.subject_id,
                        identity.role,
                        req.method(),
                        req.path()
                    );
                    req.extensions_mut().insert(identity);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(auth_err) => {
                    warn!(
                        "rejected {} {}: {}",
                        req.method(),
                        req.path(),
                        auth_err
                    );
                    let res = req.error_response(AppError::Auth(auth_err));
                    Ok(res.map_into_right_body())
                }
            }
        })
    }
}
