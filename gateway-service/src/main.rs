/// Gateway Service Main Entry Point
///
/// Starts the gRPC server with:
/// - PostgreSQL connection pool and migrations
/// - Access-token guard layered in front of every RPC
/// - SessionService (register/login/refresh) and AgentService (chat relay)
use anyhow::{anyhow, Context, Result};
use auth_tokens::TokenCodec;
use gateway_service::{
    config::Settings,
    db::{self, PgCheckpointStore, PgUserStore},
    grpc::agentgate::v1::agent_service_server::AgentServiceServer,
    grpc::agentgate::v1::session_service_server::SessionServiceServer,
    grpc::{AgentRelay, SessionGrpc},
    middleware::AccessGuardLayer,
    services::SessionManager,
};
use std::sync::Arc;
use tokio::signal;
use tonic::transport::Server;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "gateway_service=info,info".into()),
        )
        .with_target(false)
        .json()
        .init();

    info!("Starting Agent Gateway Service");

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    info!("Configuration loaded successfully");

    // Initialize database connection pool
    let db_pool = db::create_pool(&settings.database)
        .await
        .context("Failed to connect to PostgreSQL")?;
    info!(
        "Database pool initialized with {} max connections",
        settings.database.max_connections
    );

    // Run database migrations
    db::MIGRATOR
        .run(&db_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // Token codec shared by the session handlers and the access guard
    let tokens = TokenCodec::new(&settings.auth.jwt_secret);

    let users = Arc::new(PgUserStore::new(db_pool.clone()));
    let checkpoints = Arc::new(PgCheckpointStore::new(db_pool.clone()));

    let sessions = SessionManager::new(users, tokens.clone());
    let session_grpc = SessionGrpc::new(sessions);
    let agent_relay = AgentRelay::new(&settings.agent.endpoint, checkpoints)
        .context("Failed to initialize agent relay")?;
    info!(endpoint = %settings.agent.endpoint, "Agent relay configured");

    let addr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server address")?;

    info!("Starting gRPC server on {}", addr);

    let tls_required = matches!(
        std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str(),
        "production" | "staging"
    );

    let tls_config = match grpc_tls::GrpcServerTlsConfig::from_env() {
        Ok(cfg) => {
            info!("gRPC TLS configuration loaded for gateway-service");
            Some(cfg)
        }
        Err(err) => {
            if tls_required {
                return Err(anyhow!(
                    "TLS is required in production/staging but failed to load: {err}"
                ));
            }
            warn!(
                error=%err,
                "TLS configuration missing - starting without TLS (development only)"
            );
            None
        }
    };

    let mut server_builder = Server::builder();
    if let Some(cfg) = tls_config {
        let server_tls = cfg
            .build_server_tls()
            .context("Failed to build server TLS config")?;
        server_builder = server_builder
            .tls_config(server_tls)
            .context("Failed to configure gRPC TLS")?;
    }

    server_builder
        .layer(AccessGuardLayer::new(tokens))
        .add_service(SessionServiceServer::new(session_grpc))
        .add_service(AgentServiceServer::new(agent_relay))
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("gRPC server error")?;

    info!("Gateway service shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutting down gracefully...");
}
