/// Request middleware for the gateway service
///
/// Exports:
/// - AccessGuardLayer: Tower layer that authenticates every non-exempt RPC
/// - AuthContext: Verified caller identity, read from request extensions
pub mod auth;

pub use auth::{auth_context, AccessGuardLayer, AuthContext};
