//! Public address discovery.
//!
//! The host shows its public IP so the guest can be told where to connect.
//! Lookup goes through an HTTP service answering `{"ip": "<addr>"}`. When that
//! fails, the local outbound interface address is used instead, and failing
//! that the address is reported as `Unknown`. Discovery never errors out of a
//! session.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, warn};

/// Errors from a public IP lookup.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// HTTP request failed or returned a non-success status.
    #[cfg(feature = "discovery")]
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with something that is not an IP address.
    #[error("lookup returned an invalid address: {0:?}")]
    InvalidAddress(String),

    /// No lookup service is configured.
    #[error("no public IP lookup available")]
    Unavailable,
}

/// Source of this host's public IP address.
#[async_trait]
pub trait PublicIpLookup: Send + Sync {
    /// Look up the public IP address.
    async fn lookup(&self) -> Result<IpAddr, DiscoveryError>;
}

/// Lookup that always fails, leaving only the local fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

#[async_trait]
impl PublicIpLookup for NoLookup {
    async fn lookup(&self) -> Result<IpAddr, DiscoveryError> {
        Err(DiscoveryError::Unavailable)
    }
}

/// Lookup that returns a fixed address.
#[derive(Debug, Clone, Copy)]
pub struct FixedLookup(pub IpAddr);

#[async_trait]
impl PublicIpLookup for FixedLookup {
    async fn lookup(&self) -> Result<IpAddr, DiscoveryError> {
        Ok(self.0)
    }
}

/// HTTP JSON lookup against an ipify-style service.
#[cfg(feature = "discovery")]
#[cfg_attr(docsrs, doc(cfg(feature = "discovery")))]
#[derive(Debug, Clone)]
pub struct HttpIpLookup {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "discovery")]
#[derive(serde::Deserialize)]
struct IpResponse {
    ip: String,
}

#[cfg(feature = "discovery")]
impl HttpIpLookup {
    /// Create a lookup against `url` with a request timeout.
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self, DiscoveryError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Create a lookup from the session configuration.
    pub fn from_config(config: &crate::core::SessionConfig) -> Result<Self, DiscoveryError> {
        Self::new(config.ip_lookup_url.clone(), config.ip_lookup_timeout)
    }
}

#[cfg(feature = "discovery")]
#[async_trait]
impl PublicIpLookup for HttpIpLookup {
    async fn lookup(&self) -> Result<IpAddr, DiscoveryError> {
        let response: IpResponse = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        response
            .ip
            .trim()
            .parse()
            .map_err(|_| DiscoveryError::InvalidAddress(response.ip))
    }
}

/// Best known address of this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicAddr {
    /// Reported by the lookup service.
    Public(IpAddr),
    /// Local interface address (may be private).
    Local(IpAddr),
    /// Nothing could be determined.
    Unknown,
}

impl fmt::Display for PublicAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public(ip) | Self::Local(ip) => write!(f, "{ip}"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Discover this host's address, degrading instead of failing.
pub async fn discover_public_addr(lookup: &dyn PublicIpLookup) -> PublicAddr {
    match lookup.lookup().await {
        Ok(ip) => PublicAddr::Public(ip),
        Err(err) => {
            warn!(%err, "public IP lookup failed, falling back to local address");
            match local_route_ip().await {
                Some(ip) => PublicAddr::Local(ip),
                None => PublicAddr::Unknown,
            }
        }
    }
}

/// Address of the interface that routes to the public internet.
///
/// Connecting a UDP socket only performs a route lookup; nothing is sent.
async fn local_route_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from(([0, 0, 0, 0], 0))).await.ok()?;
    // TEST-NET-1, never actually contacted.
    if let Err(err) = socket.connect(SocketAddr::from(([192, 0, 2, 1], 9))).await {
        debug!(%err, "no route for local address fallback");
        return None;
    }
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_lookup_is_public() {
        let ip: IpAddr = "203.0.113.7".parse().unwrap();
        let addr = discover_public_addr(&FixedLookup(ip)).await;
        assert_eq!(addr, PublicAddr::Public(ip));
        assert_eq!(addr.to_string(), "203.0.113.7");
    }

    #[tokio::test]
    async fn test_failed_lookup_degrades() {
        let addr = discover_public_addr(&NoLookup).await;
        assert!(!matches!(addr, PublicAddr::Public(_)));
    }

    #[test]
    fn test_unknown_display() {
        assert_eq!(PublicAddr::Unknown.to_string(), "Unknown");
    }

    #[cfg(feature = "discovery")]
    #[tokio::test]
    async fn test_http_lookup_parses_json() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await.unwrap();
            let body = r#"{"ip":"198.51.100.23"}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
        });

        let lookup = HttpIpLookup::new(
            format!("http://{addr}/?format=json"),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let ip = lookup.lookup().await.unwrap();
        assert_eq!(ip, "198.51.100.23".parse::<IpAddr>().unwrap());
    }
}
