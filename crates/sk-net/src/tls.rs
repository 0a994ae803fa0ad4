//! TLS upgrade for `https` connections.

use crate::transport::BoxedIoStream;
use sk_core::BrowserError;
use sk_core::BrowserResult;
use std::net::TcpStream;

#[cfg(feature = "tls-rustls")]
use rustls::ClientConfig;
#[cfg(feature = "tls-rustls")]
use rustls::ClientConnection;
#[cfg(feature = "tls-rustls")]
use rustls::RootCertStore;
#[cfg(feature = "tls-rustls")]
use rustls::StreamOwned;
#[cfg(feature = "tls-rustls")]
use rustls::pki_types::ServerName;
#[cfg(feature = "tls-rustls")]
use std::sync::Arc;

/// Upgrades TCP streams to TLS, verifying servers against the bundled
/// Mozilla root set. The client configuration is built once and shared by
/// every connection.
#[derive(Debug, Clone)]
pub struct TlsConnector {
    #[cfg(feature = "tls-rustls")]
    config: Arc<ClientConfig>,
}

#[cfg(feature = "tls-rustls")]
impl TlsConnector {
    pub fn new() -> BrowserResult<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let mut config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|error| {
                BrowserError::new(
                    "net.tls.config_versions_invalid",
                    format!("failed to configure TLS protocol versions: {error}"),
                )
            })?
            .with_root_certificates(roots)
            .with_no_client_auth();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn connect(&self, host: &str, mut stream: TcpStream) -> BrowserResult<BoxedIoStream> {
        let server_name = ServerName::try_from(host.to_owned()).map_err(|error| {
            BrowserError::new(
                "net.tls.server_name_invalid",
                format!("invalid TLS server name `{host}`: {error}"),
            )
        })?;

        let mut connection =
            ClientConnection::new(Arc::clone(&self.config), server_name).map_err(|error| {
                BrowserError::new(
                    "net.tls.connection_init_failed",
                    format!("failed to initialize TLS connection for `{host}`: {error}"),
                )
            })?;

        connection.complete_io(&mut stream).map_err(|error| {
            BrowserError::new(
                "net.tls.handshake_failed",
                format!("TLS handshake failed for `{host}`: {error}"),
            )
        })?;

        Ok(Box::new(StreamOwned::new(connection, stream)))
    }
}

#[cfg(not(feature = "tls-rustls"))]
impl TlsConnector {
    pub fn new() -> BrowserResult<Self> {
        Ok(Self {})
    }

    pub fn connect(&self, host: &str, _stream: TcpStream) -> BrowserResult<BoxedIoStream> {
        Err(BrowserError::new(
            "net.tls.backend_unavailable",
            format!("cannot open `https://{host}`: enable `sk-net/tls-rustls`"),
        ))
    }
}
