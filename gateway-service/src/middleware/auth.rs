//! Access-token guard for incoming RPCs
//!
//! Installed as a Tower layer in front of the whole gRPC router. Every
//! RPC must carry a valid access token in `access_token` metadata, except
//! for the three session RPCs a client has to be able to reach before it
//! holds a token (register, login, refresh).
//!
//! Rejections are written as trailers-only gRPC responses, so the guard
//! never needs to know a method's request or response types. Accepted
//! requests carry an [`AuthContext`] in their extensions for handlers to
//! read.

use auth_tokens::TokenCodec;
use futures::future::BoxFuture;
use http::header::HeaderValue;
use std::task::{Context as TaskContext, Poll};
use tonic::{body::BoxBody, Request, Status};
use tower::{Layer, Service};
use tracing::debug;

pub use auth_tokens::ACCESS_TOKEN_METADATA_KEY;

/// RPCs a client may call without a token (exact path match)
const EXEMPT_METHODS: [&str; 3] = [
    "/agentgate.v1.SessionService/Register",
    "/agentgate.v1.SessionService/Login",
    "/agentgate.v1.SessionService/RefreshAccessToken",
];

/// Verified caller identity, inserted into request extensions by the guard
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
}

/// Read the caller identity established by the guard
///
/// Fails with `Unauthenticated` if the method was wired up without the
/// layer; handlers never see an unauthenticated caller otherwise.
pub fn auth_context<T>(request: &Request<T>) -> Result<AuthContext, Status> {
    request
        .extensions()
        .get::<AuthContext>()
        .cloned()
        .ok_or_else(|| Status::unauthenticated("Missing or invalid access token"))
}

/// Tower layer that installs the access-token guard
#[derive(Clone)]
pub struct AccessGuardLayer {
    codec: TokenCodec,
}

impl AccessGuardLayer {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }
}

impl<S> Layer<S> for AccessGuardLayer {
    type Service = AccessGuard<S>;

    fn layer(&self, service: S) -> Self::Service {
        AccessGuard {
            inner: service,
            codec: self.codec.clone(),
        }
    }
}

/// Tower service that authenticates each request before it reaches tonic
#[derive(Clone)]
pub struct AccessGuard<S> {
    inner: S,
    codec: TokenCodec,
}

impl<S> Service<http::Request<BoxBody>> for AccessGuard<S>
where
    S: Service<http::Request<BoxBody>, Response = http::Response<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: http::Request<BoxBody>) -> Self::Future {
        // Swap a clone into self so the returned future owns the service
        // instance that poll_ready reported ready.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        if EXEMPT_METHODS.contains(&req.uri().path()) {
            return Box::pin(async move { inner.call(req).await });
        }

        let token = match req
            .headers()
            .get(ACCESS_TOKEN_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
        {
            Some(token) => token,
            None => {
                debug!(path = %req.uri().path(), "Request rejected: no access token presented");
                return Box::pin(async move { Ok(reject("Missing access token")) });
            }
        };

        match self.codec.validate(token) {
            Ok(claims) => {
                req.extensions_mut().insert(AuthContext {
                    user_id: claims.sub,
                    username: claims.username,
                });
                Box::pin(async move { inner.call(req).await })
            }
            Err(e) => {
                debug!(
                    path = %req.uri().path(),
                    error = %e,
                    "Request rejected: access token failed validation"
                );
                Box::pin(async move { Ok(reject("Invalid or expired access token")) })
            }
        }
    }
}

/// Build a trailers-only gRPC response carrying `Code::Unauthenticated`
fn reject(message: &'static str) -> http::Response<BoxBody> {
    let mut response = http::Response::new(tonic::body::empty_body());
    let headers = response.headers_mut();
    headers.insert("content-type", HeaderValue::from_static("application/grpc"));
    // 16 = tonic::Code::Unauthenticated
    headers.insert("grpc-status", HeaderValue::from_static("16"));
    headers.insert("grpc-message", HeaderValue::from_static(message));
    response
}
