//! Session lifecycle: register, login, access-token renewal
//!
//! Credential semantics:
//! - Login issues an access token (short-lived) and a refresh token, and
//!   stores the refresh token on the user row. The store keeps a single
//!   refresh token per user, so a later login supersedes every earlier
//!   session.
//! - Renewal validates the presented refresh token, then requires it to
//!   equal the stored one. A superseded or tampered token is rejected as
//!   invalid credentials, indistinguishable from a wrong password.
//! - Renewal issues a fresh access token only. The refresh token is not
//!   rotated; the client keeps using the stored one until it expires.

use crate::db::UserStore;
use crate::error::{GatewayError, Result};
use crate::models::User;
use crate::security::{hash_password, verify_password};
use auth_tokens::TokenCodec;
use std::sync::Arc;
use tracing::{info, warn};

/// Token pair returned from a successful login
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) at which the access token expires
    pub expires_at: i64,
}

/// Fresh access token returned from a successful renewal
#[derive(Debug, Clone)]
pub struct RenewedAccess {
    pub access_token: String,
    /// Unix timestamp (seconds) at which the access token expires
    pub expires_at: i64,
}

/// Session manager: owns credential issuance and verification
#[derive(Clone)]
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    tokens: TokenCodec,
}

impl SessionManager {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenCodec) -> Self {
        Self { users, tokens }
    }

    /// Register a new user
    ///
    /// Registration does not log the user in; the client must call
    /// `login` afterwards to obtain tokens.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(GatewayError::EmptyFields);
        }

        let password_hash = hash_password(password)?;
        let user = self.users.create_user(username, email, &password_hash).await?;

        info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Authenticate a user and issue a token pair
    ///
    /// An unknown username and a wrong password are both reported as
    /// `InvalidCredentials`, so callers cannot probe which usernames exist.
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionTokens> {
        if username.is_empty() || password.is_empty() {
            return Err(GatewayError::EmptyFields);
        }

        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(GatewayError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            warn!(username = %username, "Login failed: wrong password");
            return Err(GatewayError::InvalidCredentials);
        }

        let access = self.tokens.issue_access_token(user.id, &user.username)?;
        let refresh = self.tokens.issue_refresh_token(user.id, &user.username)?;

        // Persist before returning: the stored token is the only one the
        // renewal path will accept.
        self.users.set_refresh_token(user.id, &refresh.token).await?;

        info!(user_id = user.id, username = %user.username, "User logged in");
        Ok(SessionTokens {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_at: access.expires_at,
        })
    }

    /// Exchange a refresh token for a fresh access token
    ///
    /// The presented token must be valid (signature and expiry) and must
    /// equal the token currently stored for the user. Every failure mode
    /// collapses to `InvalidCredentials`.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<RenewedAccess> {
        let claims = self.tokens.validate(refresh_token).map_err(|e| {
            warn!(error = %e, "Refresh rejected: token validation failed");
            GatewayError::InvalidCredentials
        })?;

        let stored = self.users.get_refresh_token(claims.sub).await?;
        match stored {
            Some(ref token) if token == refresh_token => {}
            _ => {
                // Either no session or a newer login replaced this token.
                warn!(user_id = claims.sub, "Refresh rejected: token superseded or unknown");
                return Err(GatewayError::InvalidCredentials);
            }
        }

        let access = self.tokens.issue_access_token(claims.sub, &claims.username)?;

        info!(user_id = claims.sub, "Access token renewed");
        Ok(RenewedAccess {
            access_token: access.token,
            expires_at: access.expires_at,
        })
    }
}
