use crate::error::AppError;
use crate::utils::SessionIssuer;
use actix_web::http::Method;
use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

pub const SESSION_HEADER: &str = "X-Session-Token";

/// Identity recovered from the session token, stored in request extensions.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub user_id: i64,
    pub phone: String,
}

// paths that require a session
struct ProtectedPaths {
    prefix_paths: Vec<&'static str>,
}

impl ProtectedPaths {
    fn new() -> Self {
        Self {
            prefix_paths: vec!["/orders"],
        }
    }

    fn is_protected(&self, path: &str) -> bool {
        self.prefix_paths.iter().any(|&prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

pub struct SessionMiddleware {
    session_issuer: SessionIssuer,
}

impl SessionMiddleware {
    pub fn new(session_issuer: SessionIssuer) -> Self {
        Self { session_issuer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service,
            session_issuer: self.session_issuer.clone(),
            protected_paths: ProtectedPaths::new(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: S,
    session_issuer: SessionIssuer,
    protected_paths: ProtectedPaths,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // preflight never carries credentials
        if req.method() == Method::OPTIONS || !self.protected_paths.is_protected(req.path()) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let token = req
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok());

        let user = self.session_issuer.decode(token).and_then(|claims| {
            Ok(CurrentUser {
                user_id: claims.user_id()?,
                phone: claims.phone,
            })
        });

        match user {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}

/// The authenticated caller, as stored by [`SessionMiddleware`].
pub fn current_user(req: &HttpRequest) -> Result<CurrentUser, AppError> {
    req.extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("Missing session token".to_string()))
}
