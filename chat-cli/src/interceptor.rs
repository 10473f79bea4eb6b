//! Client-side credential injection
//!
//! Injects the current access token into outgoing gRPC requests via
//! metadata. Only the `AgentService` client gets wrapped with this; the
//! `SessionService` client stays plain, so register, login, and refresh
//! reach the gateway without a credential attached.

use crate::session::SessionHandle;
use auth_tokens::ACCESS_TOKEN_METADATA_KEY;
use tonic::metadata::AsciiMetadataValue;
use tonic::service::Interceptor;
use tonic::{Request, Status};

/// Interceptor that injects the live access token into request metadata
///
/// Reads the token through the shared [`SessionHandle`] on every call, so
/// a renewal landing mid-session is picked up by the next RPC without
/// rebuilding the client.
#[derive(Clone)]
pub struct AccessTokenInterceptor {
    session: SessionHandle,
}

impl AccessTokenInterceptor {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }
}

impl Interceptor for AccessTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let value = AsciiMetadataValue::try_from(self.session.access_token())
            .map_err(|_| Status::internal("Access token is not valid metadata"))?;

        request
            .metadata_mut()
            .insert(ACCESS_TOKEN_METADATA_KEY, value);

        Ok(request)
    }
}
