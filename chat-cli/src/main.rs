/// Agent Gateway Chat CLI Entry Point
///
/// Dials the gateway (TLS when a CA certificate is given), walks the
/// user through login or registration, spawns the credential renewal
/// loop, and hands the terminal to the chat REPL.
use anyhow::{Context, Result};
use chat_cli::agentgate::v1::agent_service_client::AgentServiceClient;
use chat_cli::agentgate::v1::session_service_client::SessionServiceClient;
use chat_cli::session::{renewal_loop, SessionHandle};
use chat_cli::{repl, AccessTokenInterceptor};
use clap::Parser;
use grpc_tls::GrpcClientTlsConfig;
use std::path::PathBuf;
use tonic::transport::{Channel, Endpoint};
use tracing::info;

#[derive(Parser)]
#[command(name = "chat-cli", about = "Interactive client for the agent gateway")]
struct Cli {
    /// Gateway endpoint to dial
    #[arg(long, env = "GATEWAY_ENDPOINT", default_value = "http://localhost:50051")]
    endpoint: String,

    /// CA certificate to trust for TLS; plaintext when omitted
    #[arg(long, env = "GRPC_SERVER_CA_CERT_PATH")]
    ca_cert: Option<PathBuf>,

    /// Server name expected on the gateway's certificate
    #[arg(long, env = "GRPC_SERVER_DOMAIN", default_value = "localhost")]
    domain: String,

    /// Conversation the chat queries belong to
    #[arg(long, default_value = "default")]
    conversation: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "chat_cli=info".into()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let channel = connect(&cli).await?;
    info!(endpoint = %cli.endpoint, "Connected to gateway");

    let mut lines = repl::stdin_lines();
    let mut sessions = SessionServiceClient::new(channel.clone());

    let login = repl::login_prompt(&mut sessions, &mut lines).await?;
    let session = SessionHandle::new(login.access_token, login.refresh_token, login.expires_at);

    // Keeps the access token fresh in the background; gives up for good
    // if a renewal is ever rejected.
    tokio::spawn(renewal_loop(sessions, session.clone()));

    let mut agent =
        AgentServiceClient::with_interceptor(channel, AccessTokenInterceptor::new(session));

    repl::chat_loop(&mut agent, &cli.conversation, &mut lines).await
}

async fn connect(cli: &Cli) -> Result<Channel> {
    let mut endpoint = Endpoint::from_shared(cli.endpoint.clone())
        .with_context(|| format!("Invalid gateway endpoint {}", cli.endpoint))?;

    if let Some(ca_cert) = &cli.ca_cert {
        let server_ca_cert = std::fs::read_to_string(ca_cert)
            .with_context(|| format!("Failed to read CA certificate from {}", ca_cert.display()))?;
        let tls = GrpcClientTlsConfig {
            server_ca_cert,
            domain_name: cli.domain.clone(),
        }
        .build_client_tls()?;
        endpoint = endpoint.tls_config(tls)?;
    }

    endpoint
        .connect()
        .await
        .with_context(|| format!("Failed to connect to gateway at {}", cli.endpoint))
}
