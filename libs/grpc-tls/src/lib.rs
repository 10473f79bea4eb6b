//! gRPC TLS configuration for the agentgate services
//!
//! Wraps the tonic TLS plumbing behind two small config types: one for the
//! gateway's listening side, one for clients dialing it (the chat CLI and
//! the gateway's own connection to the agent backend). Certificates come
//! from PEM files named by environment variables; development and test
//! environments can fall back to freshly generated self-signed certs.

use anyhow::{Context, Result};
use std::fs;
use tonic::transport::{Certificate, ClientTlsConfig, Identity, ServerTlsConfig};
use tracing::{info, warn};

pub mod cert_generation;
pub use cert_generation::{generate_dev_certificates, CertificateBundle};

/// TLS configuration for a gRPC server
#[derive(Clone)]
pub struct GrpcServerTlsConfig {
    /// Server certificate (PEM format)
    pub cert_pem: String,
    /// Server private key (PEM format)
    pub key_pem: String,
}

impl GrpcServerTlsConfig {
    /// Load server TLS config from environment variables
    ///
    /// **Environment Variables**:
    /// - `GRPC_SERVER_CERT_PATH`: Path to server certificate PEM file
    /// - `GRPC_SERVER_KEY_PATH`: Path to server private key PEM file
    pub fn from_env() -> Result<Self> {
        let cert_path = std::env::var("GRPC_SERVER_CERT_PATH")
            .context("GRPC_SERVER_CERT_PATH not set - TLS required for production")?;

        let key_path = std::env::var("GRPC_SERVER_KEY_PATH")
            .context("GRPC_SERVER_KEY_PATH not set - TLS required for production")?;

        let cert_pem = fs::read_to_string(&cert_path)
            .with_context(|| format!("Failed to read server certificate from {}", cert_path))?;

        let key_pem = fs::read_to_string(&key_path)
            .with_context(|| format!("Failed to read server key from {}", key_path))?;

        info!(cert_path = %cert_path, "gRPC server TLS configuration loaded");

        Ok(Self { cert_pem, key_pem })
    }

    /// Create development config with self-signed certificates
    ///
    /// **WARNING**: Only use in development/testing, NEVER in production
    pub fn development() -> Result<Self> {
        warn!("Using development TLS config with self-signed certificates - NOT for production");

        let bundle = cert_generation::generate_dev_certificates()?;

        Ok(Self {
            cert_pem: bundle.server_cert,
            key_pem: bundle.server_key,
        })
    }

    /// Build tonic ServerTlsConfig
    pub fn build_server_tls(&self) -> Result<ServerTlsConfig> {
        let identity = Identity::from_pem(&self.cert_pem, &self.key_pem);
        Ok(ServerTlsConfig::new().identity(identity))
    }
}

/// TLS configuration for a gRPC client
#[derive(Clone)]
pub struct GrpcClientTlsConfig {
    /// Server CA certificate to trust (PEM format)
    pub server_ca_cert: String,
    /// Server domain name for certificate validation
    pub domain_name: String,
}

impl GrpcClientTlsConfig {
    /// Load client TLS config from environment variables
    ///
    /// **Environment Variables**:
    /// - `GRPC_SERVER_CA_CERT_PATH`: Path to server CA certificate
    /// - `GRPC_SERVER_DOMAIN`: Server domain name (default: "localhost")
    pub fn from_env() -> Result<Self> {
        let ca_cert_path = std::env::var("GRPC_SERVER_CA_CERT_PATH")
            .context("GRPC_SERVER_CA_CERT_PATH not set - TLS required for production")?;

        let server_ca_cert = fs::read_to_string(&ca_cert_path)
            .with_context(|| format!("Failed to read server CA cert from {}", ca_cert_path))?;

        let domain_name =
            std::env::var("GRPC_SERVER_DOMAIN").unwrap_or_else(|_| "localhost".to_string());

        info!(domain = %domain_name, "gRPC client TLS configuration loaded");

        Ok(Self {
            server_ca_cert,
            domain_name,
        })
    }

    /// Create development config trusting the given CA
    pub fn development(server_ca_cert: String, domain: &str) -> Self {
        warn!("Using development client TLS config - NOT for production");

        Self {
            server_ca_cert,
            domain_name: domain.to_string(),
        }
    }

    /// Build tonic ClientTlsConfig
    pub fn build_client_tls(&self) -> Result<ClientTlsConfig> {
        let server_ca = Certificate::from_pem(&self.server_ca_cert);

        Ok(ClientTlsConfig::new()
            .ca_certificate(server_ca)
            .domain_name(&self.domain_name))
    }
}
