//! WebSocket connection opening, optionally tunnelled through a proxy.

use super::errors::TransportError;
use crate::proxy::{ProxyKind, ProxyRoute, ProxySelector};
use std::sync::Arc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tokio_socks::tcp::{Socks4Stream, Socks5Stream};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, client_async_tls, connect_async, tungstenite::http::Uri,
};

/// Stream type produced for both direct and tunnelled connections
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upper bound on a proxy's CONNECT response headers
const MAX_TUNNEL_RESPONSE: usize = 8 * 1024;

/// Opens WebSocket connections, routing each through the selector's next
/// proxy when one is configured.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    selector: Option<Arc<ProxySelector>>,
}

impl Transport {
    pub fn new(selector: Option<Arc<ProxySelector>>) -> Self {
        Self { selector }
    }

    /// Transport that always connects directly
    pub fn direct() -> Self {
        Self::default()
    }

    pub fn selector(&self) -> Option<&Arc<ProxySelector>> {
        self.selector.as_ref()
    }

    /// Open a WebSocket to `url`.
    ///
    /// The selector's sequential assignment is consulted exactly once per call.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection, the proxy tunnel, or the
    /// WebSocket handshake fails.
    pub async fn open(&self, url: &str) -> Result<WsStream, TransportError> {
        let route = match &self.selector {
            Some(selector) => Some(selector.next_route()?),
            None => None,
        };

        match route {
            None => {
                let (ws, _) = connect_async(url).await?;
                Ok(ws)
            }
            Some(route) => {
                let (host, port) = target_of(url)?;
                let stream = open_tunnel(&route, &host, port).await?;
                let (ws, _) = client_async_tls(url, stream).await?;
                Ok(ws)
            }
        }
    }
}

/// Host and port a WebSocket URL points at
fn target_of(url: &str) -> Result<(String, u16), TransportError> {
    let uri: Uri = url
        .parse()
        .map_err(|_| TransportError::InvalidUrl(url.to_string()))?;
    let host = uri
        .host()
        .ok_or_else(|| TransportError::InvalidUrl(url.to_string()))?
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string();
    let port = match (uri.port_u16(), uri.scheme_str()) {
        (Some(port), _) => port,
        (None, Some("wss")) | (None, Some("https")) => 443,
        (None, _) => 80,
    };
    Ok((host, port))
}

/// Open a TCP stream to `host:port` through the route's proxy.
pub async fn open_tunnel(
    route: &ProxyRoute,
    host: &str,
    port: u16,
) -> Result<TcpStream, TransportError> {
    let stream = match route.kind() {
        ProxyKind::HttpConnect => http_connect(route, host, port).await?,
        ProxyKind::Socks4 | ProxyKind::Socks5 => socks_connect(route, host, port).await?,
    };
    log::debug!(
        "Tunnel to {}:{} open via {} ({})",
        host,
        port,
        route.endpoint(),
        route.kind()
    );
    Ok(stream)
}

async fn socks_connect(
    route: &ProxyRoute,
    host: &str,
    port: u16,
) -> Result<TcpStream, TransportError> {
    let proxy = (route.host(), route.port());
    let target = (host, port);

    let connected = match (route.kind(), route.credentials()) {
        (ProxyKind::Socks5, Some((user, pass))) => {
            Socks5Stream::connect_with_password(proxy, target, user, pass)
                .await
                .map(Socks5Stream::into_inner)
        }
        (ProxyKind::Socks5, None) => Socks5Stream::connect(proxy, target)
            .await
            .map(Socks5Stream::into_inner),
        (_, Some((user, _))) => Socks4Stream::connect_with_userid(proxy, target, user)
            .await
            .map(Socks4Stream::into_inner),
        (_, None) => Socks4Stream::connect(proxy, target)
            .await
            .map(Socks4Stream::into_inner),
    };

    let stream = connected.map_err(|source| TransportError::Socks {
        proxy: route.endpoint().to_string(),
        source,
    })?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Ask an HTTP proxy for a tunnel with an HTTP/1.1 CONNECT.
async fn http_connect(
    route: &ProxyRoute,
    host: &str,
    port: u16,
) -> Result<TcpStream, TransportError> {
    let mut stream = TcpStream::connect((route.host(), route.port())).await?;
    stream.set_nodelay(true)?;

    let authority = if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };

    let mut request = format!("CONNECT {authority} HTTP/1.1\r\nHost: {authority}\r\n");
    if let Some(auth) = route.authorization() {
        request.push_str(&format!("Proxy-Authorization: {auth}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    // Read byte by byte so nothing past the header block is consumed.
    let mut response = Vec::with_capacity(256);
    while !response.ends_with(b"\r\n\r\n") {
        if response.len() >= MAX_TUNNEL_RESPONSE {
            return Err(TransportError::TunnelResponseTooLarge(
                route.endpoint().to_string(),
            ));
        }
        let byte = stream.read_u8().await?;
        response.push(byte);
    }

    let status_line = String::from_utf8_lossy(&response)
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();
    let accepted = status_line
        .split_whitespace()
        .nth(1)
        .is_some_and(|code| code.starts_with('2'));

    if !accepted {
        return Err(TransportError::TunnelRefused {
            proxy: route.endpoint().to_string(),
            status: status_line,
        });
    }

    Ok(stream)
}
