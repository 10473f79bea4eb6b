//! Signed session credentials for the agentgate services
//!
//! This crate owns issuance and validation of the two credential kinds the
//! gateway hands out: short-lived access tokens presented on every gated
//! call, and long-lived refresh tokens presented only to the renewal
//! endpoint. Both are HS256 JWTs carrying the same claims; they differ only
//! in their expiry window.
//!
//! ## Security Design
//!
//! - **HS256 with an injected secret**: the signing key is passed to
//!   [`TokenCodec::new`] at construction and is immutable afterwards. There
//!   is no process-global key state; every component that validates tokens
//!   receives its own clone of the codec.
//! - **Fail-closed validation**: algorithm, signature, and expiry are all
//!   checked; any mismatch yields a typed [`TokenError`], never a
//!   partially-trusted claims value.
//! - **Expiry at validation time**: `exp` is compared against the wall
//!   clock when the token is presented, not when it was minted.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Metadata key under which clients present their access token.
pub const ACCESS_TOKEN_METADATA_KEY: &str = "access_token";

/// Access tokens authorize gated calls and stay valid for 15 minutes.
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh tokens are exchanged for fresh access tokens and live for 7 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

const JWT_ALGORITHM: Algorithm = Algorithm::HS256;

// ============================================================================
// Data Structures
// ============================================================================

/// JWT claims carried by both credential kinds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (numeric user id)
    pub sub: i64,
    /// Username at issuance time
    pub username: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// A freshly minted credential plus its expiry instant
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Unix timestamp (seconds) at which the token expires
    pub expires_at: i64,
}

/// Validation and signing failures
///
/// The three validation variants are deliberately coarse: callers get told
/// *that* a token is expired, forged, or garbled, never anything finer.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

// ============================================================================
// Codec
// ============================================================================

/// Issues and validates signed session credentials
///
/// Construct one at startup from the configured secret and clone it into
/// every component that needs to mint or check tokens. Cloning is cheap;
/// the underlying keys are reference-counted byte buffers.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(JWT_ALGORITHM),
        }
    }

    /// Issue a short-lived access token for the given identity.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(user_id, username, Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES))
    }

    /// Issue a long-lived refresh token for the given identity.
    pub fn issue_refresh_token(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<IssuedToken, TokenError> {
        self.issue(user_id, username, Duration::days(REFRESH_TOKEN_EXPIRY_DAYS))
    }

    fn issue(
        &self,
        user_id: i64,
        username: &str,
        lifetime: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = Utc::now();
        let expires_at = (now + lifetime).timestamp();

        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            iat: now.timestamp(),
            exp: expires_at,
        };

        let token = encode(&Header::new(JWT_ALGORITHM), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Validate a token and return its claims.
    ///
    /// ## Errors
    ///
    /// - [`TokenError::Expired`] when `exp` has passed
    /// - [`TokenError::BadSignature`] when the signature does not verify
    ///   under this codec's key
    /// - [`TokenError::Malformed`] for everything else (wrong algorithm,
    ///   truncated token, bogus claims)
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
