/// Agent Gateway Chat CLI Library
///
/// Interactive terminal client for the agent gateway. Registers and logs
/// in over `SessionService`, keeps the access token fresh in the
/// background, and drives a lockstep chat REPL over `AgentService`.
///
/// ## Modules
///
/// - `interceptor`: Injects the current access token into outgoing RPCs
/// - `repl`: Login prompt and chat loop
/// - `session`: Shared session state and the credential renewal loop
pub mod interceptor;
pub mod repl;
pub mod session;

/// Generated protobuf/gRPC bindings for the gateway API
pub mod agentgate {
    pub mod v1 {
        tonic::include_proto!("agentgate.v1");
    }
}

pub use interceptor::AccessTokenInterceptor;
pub use session::{SessionHandle, SessionSnapshot};
