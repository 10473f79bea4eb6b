/// Agent Gateway Service Library
///
/// Authenticating gRPC gateway in front of a conversational agent backend.
/// Terminates client credentials (register/login/refresh), guards every
/// other RPC behind an access token, and relays chat streams to the agent.
///
/// ## Modules
///
/// - `config`: Service configuration
/// - `db`: Database repositories (users, conversation checkpoints)
/// - `error`: Error types
/// - `grpc`: gRPC server implementation
/// - `middleware`: Access-token guard installed in front of every RPC
/// - `models`: Data models
/// - `security`: Password hashing
/// - `services`: Business logic (session lifecycle)
pub mod config;
pub mod db;
pub mod error;
pub mod grpc;
pub mod middleware;
pub mod models;
pub mod security;
pub mod services;

// Re-export commonly used types
pub use error::{GatewayError, Result};
pub use grpc::{AgentRelay, SessionGrpc};
