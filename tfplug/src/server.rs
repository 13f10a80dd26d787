//! Server module for running Terraform providers
//!
//! Performs the go-plugin handshake and serves the provider over gRPC,
//! with TLS when a certificate is configured.

use crate::error::{Result, TfplugError};
use crate::grpc::GrpcProviderServer;
use crate::proto::ProviderServer;
use crate::provider::Provider;
use std::path::PathBuf;
use tonic::transport::{Identity, Server, ServerTlsConfig};

/// Environment variable Terraform sets when launching a plugin
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Expected value of [`MAGIC_COOKIE_KEY`]
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const PROTOCOL_VERSION: u32 = 6;

/// PEM certificate and key used to serve over TLS
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Server configuration for running a Terraform provider
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Serve plaintext when unset
    pub tls: Option<TlsFiles>,
    /// Maximum message size in bytes
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tls: None,
            max_message_size: 256 << 20, // 256MB
        }
    }
}

impl ServerConfig {
    /// Create a new server configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve over TLS using the given PEM files
    pub fn with_tls(mut self, cert_path: PathBuf, key_path: PathBuf) -> Self {
        self.tls = Some(TlsFiles {
            cert_path,
            key_path,
        });
        self
    }

    /// Set the maximum message size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }
}

/// Fails unless the process was launched by Terraform
pub fn check_magic_cookie() -> Result<()> {
    match std::env::var(MAGIC_COOKIE_KEY) {
        Ok(value) if value == MAGIC_COOKIE_VALUE => Ok(()),
        _ => Err(TfplugError::Handshake(
            "this binary is a Terraform plugin and is not meant to be executed directly"
                .to_string(),
        )),
    }
}

/// go-plugin handshake line announced on stdout
pub fn handshake_line(addr: &std::net::SocketAddr) -> String {
    format!("1|{}|tcp|{}|grpc", PROTOCOL_VERSION, addr)
}

async fn load_tls(files: &TlsFiles) -> Result<ServerTlsConfig> {
    let cert = tokio::fs::read(&files.cert_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read certificate: {}", e)))?;

    let key = tokio::fs::read(&files.key_path)
        .await
        .map_err(|e| TfplugError::TlsError(format!("Failed to read key: {}", e)))?;

    // Another component may already have installed a provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    Ok(ServerTlsConfig::new().identity(Identity::from_pem(cert, key)))
}

/// Main entry point for running a provider
pub async fn serve<P: Provider + 'static>(provider: P, config: ServerConfig) -> Result<()> {
    check_magic_cookie()?;

    let grpc_server = GrpcProviderServer::new(provider);
    let provider_service = ProviderServer::new(grpc_server)
        .max_decoding_message_size(config.max_message_size)
        .max_encoding_message_size(config.max_message_size);

    let mut builder = Server::builder();
    if let Some(files) = &config.tls {
        builder = builder.tls_config(load_tls(files).await?)?;
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!(
        address = %actual_addr,
        tls = config.tls.is_some(),
        "Provider server listening"
    );
    println!("{}", handshake_line(&actual_addr));

    let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
    builder
        .add_service(provider_service)
        .serve_with_incoming(incoming)
        .await?;

    Ok(())
}

/// Convenience function to run a provider with default configuration
pub async fn serve_default<P: Provider + 'static>(provider: P) -> Result<()> {
    serve(provider, ServerConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn handshake_line_announces_protocol_six() {
        let addr: std::net::SocketAddr = "127.0.0.1:43123".parse().unwrap();
        assert_eq!(handshake_line(&addr), "1|6|tcp|127.0.0.1:43123|grpc");
    }

    #[test]
    #[serial]
    fn magic_cookie_is_required() {
        std::env::remove_var(MAGIC_COOKIE_KEY);
        assert!(matches!(
            check_magic_cookie(),
            Err(TfplugError::Handshake(_))
        ));

        std::env::set_var(MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE);
        assert!(check_magic_cookie().is_ok());
        std::env::remove_var(MAGIC_COOKIE_KEY);
    }

    #[test]
    fn tls_is_opt_in() {
        assert!(ServerConfig::new().tls.is_none());

        let config = ServerConfig::new().with_tls("cert.pem".into(), "key.pem".into());
        assert_eq!(
            config.tls.map(|files| files.cert_path),
            Some(PathBuf::from("cert.pem"))
        );
    }
}
