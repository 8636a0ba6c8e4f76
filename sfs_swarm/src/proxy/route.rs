//! Parsed proxy endpoints.

use super::errors::ProxyError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fmt;

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_SOCKS_PORT: u16 = 1080;

/// Protocol spoken to a proxy to reach the target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    /// HTTP/1.1 `CONNECT` tunnel
    HttpConnect,
    /// SOCKS4, or SOCKS4a for host names
    Socks4,
    Socks5,
}

impl ProxyKind {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Self::HttpConnect),
            "socks4" | "socks4a" => Some(Self::Socks4),
            "socks" | "socks5" | "socks5h" => Some(Self::Socks5),
            _ => None,
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Self::HttpConnect => DEFAULT_HTTP_PORT,
            Self::Socks4 | Self::Socks5 => DEFAULT_SOCKS_PORT,
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HttpConnect => "http",
            Self::Socks4 => "socks4",
            Self::Socks5 => "socks5",
        };
        write!(f, "{repr}")
    }
}

/// A connection-routing handle for one proxy endpoint.
///
/// Built once per distinct endpoint string and shared by every connection
/// routed through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRoute {
    endpoint: String,
    kind: ProxyKind,
    host: String,
    port: u16,
    userinfo: Option<String>,
}

impl ProxyRoute {
    /// Parse `scheme://[user[:pass]@]host[:port][/]` or a bare `host:port`.
    ///
    /// Schemes are `http`, `socks4`/`socks4a` and `socks5`/`socks5h`/`socks`.
    /// A bare endpoint is an HTTP proxy. IPv6 hosts must be bracketed.
    pub fn parse(endpoint: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: &str| ProxyError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: reason.to_string(),
        };

        let (kind, rest) = match endpoint.split_once("://") {
            Some((scheme, rest)) => match ProxyKind::from_scheme(scheme) {
                Some(kind) => (kind, rest),
                None => {
                    return Err(ProxyError::UnsupportedScheme {
                        endpoint: endpoint.to_string(),
                        scheme: scheme.to_string(),
                    });
                }
            },
            None => (ProxyKind::HttpConnect, endpoint),
        };

        let authority = rest.split('/').next().unwrap_or_default();
        let (userinfo, hostport) = match authority.rsplit_once('@') {
            Some((userinfo, hostport)) => (Some(userinfo), hostport),
            None => (None, authority),
        };

        let (host, port) = split_host_port(hostport, kind.default_port())
            .ok_or_else(|| invalid("bad host or port"))?;
        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            kind,
            host: host.to_string(),
            port,
            userinfo: userinfo.filter(|u| !u.is_empty()).map(str::to_string),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Username and password, the password empty when none was given
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.userinfo
            .as_deref()
            .map(|u| u.split_once(':').unwrap_or((u, "")))
    }

    /// Value for a `Proxy-Authorization` header, when credentials were given
    pub fn authorization(&self) -> Option<String> {
        self.userinfo
            .as_deref()
            .map(|u| format!("Basic {}", STANDARD.encode(u)))
    }
}

fn split_host_port(hostport: &str, default_port: u16) -> Option<(&str, u16)> {
    if let Some(rest) = hostport.strip_prefix('[') {
        let (host, after) = rest.split_once(']')?;
        let port = match after.strip_prefix(':') {
            Some(p) => p.parse().ok()?,
            None if after.is_empty() => default_port,
            None => return None,
        };
        return Some((host, port));
    }

    let (host, port) = match hostport.rsplit_once(':') {
        Some((host, port)) => (host, port.parse().ok()?),
        None => (hostport, default_port),
    };
    // Unbracketed IPv6 is ambiguous.
    if host.contains(':') {
        return None;
    }
    Some((host, port))
}
