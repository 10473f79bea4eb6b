/// gRPC server module for the gateway service
///
/// Exports:
/// - SessionGrpc: SessionService implementation (register/login/refresh)
/// - AgentRelay: AgentService implementation (chat stream relay)
/// - agentgate: Generated protobuf types from agent_gateway.proto
pub mod server;

pub use server::agentgate;
pub use server::{AgentRelay, SessionGrpc};
