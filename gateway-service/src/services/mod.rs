/// Service layer for the gateway service
///
/// Provides business logic:
/// - Session lifecycle (register, login, access-token renewal)
pub mod sessions;

pub use sessions::{RenewedAccess, SessionManager, SessionTokens};
