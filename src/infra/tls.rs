//! TLS/SSL infrastructure.
//!
//! Provides trait-based abstractions for TLS configuration and connection handling.

use rustls::pki_types::ServerName;
use std::sync::{Arc, OnceLock};
use tokio::net::TcpStream;
use tokio_rustls::{client::TlsStream, TlsConnector};

use crate::error::RelayError;

/// Trait for TLS configuration providers.
pub trait TlsProvider: Send + Sync {
    /// Returns the TLS client configuration used for outbound connections.
    fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, RelayError>;

    /// Creates a TLS connector from this provider's configuration.
    fn connector(&self) -> Result<TlsConnector, RelayError> {
        self.client_config().map(TlsConnector::from)
    }
}

/// Default TLS provider using rustls with Mozilla's root certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustlsTlsProvider;

impl RustlsTlsProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TlsProvider for RustlsTlsProvider {
    fn client_config(&self) -> Result<Arc<rustls::ClientConfig>, RelayError> {
        static CONFIG: OnceLock<Arc<rustls::ClientConfig>> = OnceLock::new();
        if let Some(config) = CONFIG.get() {
            return Ok(config.clone());
        }
        let config = create_tls_config()?;
        Ok(CONFIG.get_or_init(|| config).clone())
    }
}

/// Creates a TLS client configuration with Mozilla's root certificates.
///
/// This configuration:
/// - Uses the ring crypto provider explicitly, so no process default is needed
/// - Uses webpki-roots for trusted root certificates
/// - Does not use client authentication
/// - Supports TLS 1.2 and TLS 1.3
pub fn create_tls_config() -> Result<Arc<rustls::ClientConfig>, RelayError> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| RelayError::Tls(format!("unusable TLS configuration: {}", e)))?
    .with_root_certificates(root_store)
    .with_no_client_auth();

    Ok(Arc::new(config))
}

/// Establishes a TLS connection over an existing TCP stream.
///
/// `server_name` is used for SNI and certificate verification; IP literals
/// are accepted.
pub async fn connect_tls<P: TlsProvider + ?Sized>(
    provider: &P,
    tcp_stream: TcpStream,
    server_name: &str,
) -> Result<TlsStream<TcpStream>, RelayError> {
    let connector = provider.connector()?;

    let server_name = ServerName::try_from(server_name.to_string())
        .map_err(|e| RelayError::Tls(format!("invalid server name: {}", e)))?;

    connector
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| RelayError::Tls(e.to_string()))
}
