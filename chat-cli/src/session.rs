//! Shared session state and the background credential renewal loop
//!
//! Login fills a [`SessionHandle`]; the renewal loop and the credential
//! interceptor share it from then on. The handle wraps a std `RwLock`
//! (short critical sections, never held across an await), mirroring how
//! the gateway shares its token codec.

use crate::agentgate::v1::session_service_client::SessionServiceClient;
use crate::agentgate::v1::RefreshAccessTokenRequest;
use chrono::Utc;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tonic::transport::Channel;
use tracing::{error, info};

/// How long before access-token expiry the renewal loop wakes up
const RENEWAL_LEAD_SECONDS: i64 = 60;

/// Point-in-time view of the session credentials
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires
    pub expires_at: i64,
}

/// Cloneable handle to the live session credentials
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<RwLock<SessionSnapshot>>,
}

impl SessionHandle {
    pub fn new(access_token: String, refresh_token: String, expires_at: i64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(SessionSnapshot {
                access_token,
                refresh_token,
                expires_at,
            })),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.read().unwrap().clone()
    }

    pub fn access_token(&self) -> String {
        self.inner.read().unwrap().access_token.clone()
    }

    /// Swap in a renewed access token; the refresh token stays put
    pub fn set_access_token(&self, access_token: String, expires_at: i64) {
        let mut state = self.inner.write().unwrap();
        state.access_token = access_token;
        state.expires_at = expires_at;
    }
}

/// How long to sleep before the next renewal attempt
///
/// Wakes [`RENEWAL_LEAD_SECONDS`] before expiry; a token already at (or
/// past) that point renews immediately.
fn renewal_delay(expires_at: i64, now: i64) -> Duration {
    let secs = expires_at - now - RENEWAL_LEAD_SECONDS;
    Duration::from_secs(secs.max(0) as u64)
}

/// Keep the access token fresh until a renewal fails
///
/// Sleeps until shortly before expiry, exchanges the stored refresh
/// token for a fresh access token, swaps it into the session, and goes
/// back to sleep. Any renewal failure is terminal: the server rejects a
/// refresh token that expired or was superseded by a newer login, and
/// retrying cannot fix either. The loop logs the failure and returns;
/// gated calls start failing once the last access token runs out.
pub async fn renewal_loop(mut client: SessionServiceClient<Channel>, session: SessionHandle) {
    loop {
        let snapshot = session.snapshot();
        let delay = renewal_delay(snapshot.expires_at, Utc::now().timestamp());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        info!("Access token expiring soon, renewing");

        let request = RefreshAccessTokenRequest {
            refresh_token: snapshot.refresh_token,
        };
        match client.refresh_access_token(request).await {
            Ok(response) => {
                let renewed = response.into_inner();
                let expires_at = renewed.expires_at;
                session.set_access_token(renewed.access_token, expires_at);
                info!(expires_at, "Access token renewed");
            }
            Err(status) => {
                error!(error = %status, "Access token renewal failed, stopping renewals");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_lands_one_minute_before_expiry() {
        let now = 1_700_000_000;
        let expires_at = now + 15 * 60;
        assert_eq!(renewal_delay(expires_at, now), Duration::from_secs(14 * 60));
    }

    #[test]
    fn expired_token_renews_immediately() {
        let now = 1_700_000_000;
        assert_eq!(renewal_delay(now - 10, now), Duration::ZERO);
        // Inside the lead window counts as "now" too.
        assert_eq!(renewal_delay(now + 30, now), Duration::ZERO);
    }

    #[test]
    fn renewed_access_token_keeps_refresh_token() {
        let session = SessionHandle::new("old-access".into(), "refresh".into(), 100);

        session.set_access_token("new-access".into(), 200);

        let snapshot = session.snapshot();
        assert_eq!(snapshot.access_token, "new-access");
        assert_eq!(snapshot.refresh_token, "refresh");
        assert_eq!(snapshot.expires_at, 200);
    }

    #[test]
    fn handles_share_state() {
        let session = SessionHandle::new("a".into(), "r".into(), 1);
        let clone = session.clone();

        clone.set_access_token("b".into(), 2);

        assert_eq!(session.access_token(), "b");
    }
}
