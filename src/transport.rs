use std::{net::SocketAddr, path::PathBuf};

/// Default permission bits of a unix socket file.
pub const DEFAULT_SOCKET_MODE: u32 = 0o777;

/// A unix domain socket listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixTransport {
    /// Socket file path. A stale file at this path is removed on start.
    pub path: PathBuf,
    /// Permission bits applied to the socket file.
    pub mode: u32,
}

/// A TCP listener with TLS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsTransport {
    /// Listen address.
    pub addr: SocketAddr,
    /// PEM certificate chain.
    pub cert: PathBuf,
    /// PEM private key.
    pub key: PathBuf,
}

/// Immutable service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) route: String,
    pub(crate) unix: Option<UnixTransport>,
    pub(crate) tls: Option<TlsTransport>,
    pub(crate) behind_proxy: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            route: "/".to_owned(),
            unix: None,
            tls: None,
            behind_proxy: false,
        }
    }
}

/// Normalize a route: trimmed, never empty, always starting with `/`.
pub fn sanitize_route(route: &str) -> String {
    let route = route.trim();
    if route.starts_with('/') {
        route.to_owned()
    } else {
        format!("/{route}")
    }
}
