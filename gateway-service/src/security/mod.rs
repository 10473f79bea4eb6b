/// Security utilities for the gateway service
///
/// - `password`: Argon2id hashing and verification
pub mod password;

pub use password::{hash_password, verify_password};
