// Build script for gateway-service
// Compiles agent_gateway.proto for gRPC server and client code generation
fn main() {
    println!("cargo:rerun-if-changed=../proto/agent_gateway.proto");

    // gateway-service PROVIDES SessionService and AgentService (server implementations)
    // Client code is also generated for integration tests and the agent backend stub
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&["../proto/agent_gateway.proto"], &["../proto"])
        .expect("Failed to compile agent_gateway.proto for gateway-service");
}
