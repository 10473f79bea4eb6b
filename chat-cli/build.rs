// Build script for chat-cli
// Compiles agent_gateway.proto for gRPC client code generation
fn main() {
    println!("cargo:rerun-if-changed=../proto/agent_gateway.proto");

    // chat-cli only CONSUMES the gateway services, so no server stubs
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["../proto/agent_gateway.proto"], &["../proto"])
        .expect("Failed to compile agent_gateway.proto for chat-cli");
}
