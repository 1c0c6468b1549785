//! Client address and host resolution.
//!
//! A service either trusts the reverse proxy in front of it, and reads the
//! client address from the `X-Real-IP` and `X-Client-IP` headers, or it uses
//! the transport peer address. It never mixes the two.

use http::{HeaderMap, HeaderName, Uri};
use std::net::{IpAddr, SocketAddr};

/// Header set by reverse proxies carrying the client address.
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
/// Fallback header carrying the client address.
pub const X_CLIENT_IP: HeaderName = HeaderName::from_static("x-client-ip");
/// Header set by reverse proxies carrying the original `Host`.
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");

/// Parse an address that is either a bare IP or an `ip:port` pair.
fn parse_ip(value: &str) -> Option<IpAddr> {
    let value = value.trim();
    value
        .parse::<IpAddr>()
        .ok()
        .or_else(|| value.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

fn header_ip(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_ip)
}

/// Client address as reported by an upstream reverse proxy.
///
/// `X-Real-IP` wins over `X-Client-IP`. A header that does not parse is
/// treated as absent.
pub fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_ip(headers, &X_REAL_IP).or_else(|| header_ip(headers, &X_CLIENT_IP))
}

/// Resolve the client address for a request.
///
/// When `behind_proxy` is set only the proxy headers are consulted,
/// otherwise only the transport peer address is. Unix socket peers have no
/// address. IPv4-mapped IPv6 addresses come back in their IPv4 form.
pub fn client_ip(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    behind_proxy: bool,
) -> Option<IpAddr> {
    let ip = if behind_proxy {
        forwarded_client_ip(headers)
    } else {
        peer.map(|addr| addr.ip())
    };
    ip.map(|ip| ip.to_canonical())
}

/// Resolve the host the client addressed.
///
/// `X-Forwarded-Host` wins over `Host`, which wins over the request URI
/// authority.
pub fn host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let header = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    };

    header(&X_FORWARDED_HOST)
        .or_else(|| header(&http::header::HOST))
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
}
