//! Integration tests for TLS configuration built from certificates on disk
//!
//! Exercises the development flow end to end: generate a bundle, write it
//! out, and build both server and client configs from the written files.

use grpc_tls::{
    cert_generation::{generate_dev_certificates, write_cert_bundle},
    GrpcClientTlsConfig, GrpcServerTlsConfig,
};
use std::fs;
use tempfile::TempDir;

/// Write a fresh certificate bundle into a temp directory
fn setup_cert_dir() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let bundle = generate_dev_certificates().unwrap();

    write_cert_bundle(&bundle, temp_dir.path()).unwrap();

    temp_dir
}

#[test]
fn test_server_config_from_written_files() {
    let certs = setup_cert_dir();

    let cert_pem = fs::read_to_string(certs.path().join("server.crt")).unwrap();
    let key_pem = fs::read_to_string(certs.path().join("server.key")).unwrap();

    let config = GrpcServerTlsConfig { cert_pem, key_pem };
    assert!(
        config.build_server_tls().is_ok(),
        "Failed to build server TLS"
    );
}

#[test]
fn test_client_config_from_written_files() {
    let certs = setup_cert_dir();

    let server_ca_cert = fs::read_to_string(certs.path().join("ca.crt")).unwrap();

    let config = GrpcClientTlsConfig {
        server_ca_cert,
        domain_name: "localhost".to_string(),
    };
    assert!(
        config.build_client_tls().is_ok(),
        "Failed to build client TLS"
    );
}

#[test]
fn test_bundle_files_are_pem() {
    let certs = setup_cert_dir();

    for name in ["ca.crt", "server.crt"] {
        let pem = fs::read_to_string(certs.path().join(name)).unwrap();
        assert!(pem.contains("BEGIN CERTIFICATE"), "{name} is not PEM");
    }

    let key = fs::read_to_string(certs.path().join("server.key")).unwrap();
    assert!(key.contains("PRIVATE KEY"));
}
