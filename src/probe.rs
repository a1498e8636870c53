// ABOUTME: Health endpoint probing over plain HTTP/1.1.
// ABOUTME: HttpProbe issues a GET with hyper over a TCP stream; any 2xx status is healthy.

use async_trait::async_trait;
use http_body_util::Empty;
use hyper::Uri;
use hyper_util::rt::TokioIo;
use std::time::Duration;
use tokio::net::TcpStream;

/// Errors from a single probe attempt.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("invalid health URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// A single readiness probe.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok(true)` when the endpoint reports healthy, `Ok(false)` when it
    /// answers with a non-success status.
    async fn check(&self, url: &str, timeout: Duration) -> Result<bool, ProbeError>;
}

/// HTTP GET probe.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpProbe;

/// Host, port and path-and-query of an `http://` URL.
fn parse_target(url: &str) -> Result<(String, u16, String, Uri), ProbeError> {
    let invalid = |reason: &str| ProbeError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let uri: Uri = url.parse().map_err(|_| invalid("not a valid URI"))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(_) => return Err(invalid("only http:// URLs are supported")),
        None => return Err(invalid("missing scheme")),
    }
    let host = uri.host().ok_or_else(|| invalid("missing host"))?.to_string();
    let port = uri.port_u16().unwrap_or(80);
    let path = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Ok((host, port, path, uri))
}

impl HttpProbe {
    async fn get(&self, url: &str) -> Result<bool, ProbeError> {
        let (host, port, path, uri) = parse_target(url)?;
        let addr = format!("{}:{}", host, port);

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|source| ProbeError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let io = TokioIo::new(stream);

        let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!("health probe connection error: {}", e);
            }
        });

        let host_header = match uri.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host,
        };
        let req = hyper::Request::builder()
            .method("GET")
            .uri(path)
            .header("Host", host_header)
            .header("User-Agent", concat!("heckx-deploy/", env!("CARGO_PKG_VERSION")))
            .body(Empty::<bytes::Bytes>::new())?;

        let resp = sender.send_request(req).await?;
        tracing::debug!("GET {} -> {}", url, resp.status());
        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn check(&self, url: &str, timeout: Duration) -> Result<bool, ProbeError> {
        tokio::time::timeout(timeout, self.get(url))
            .await
            .map_err(|_| ProbeError::Timeout(timeout))?
    }
}
