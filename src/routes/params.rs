use crate::{addr, auth, ctx::RequestMeta, ErrorPayload, RpcRecv};
use http::{header, HeaderMap, Uri, Version};
use serde_json::value::RawValue;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

/// The read-only view of a call given to handlers.
///
/// Exposes the JSON-RPC members of the request along with the transport
/// facts a handler may need. Instances are created per call.
#[derive(Debug, Clone)]
pub struct Parameters {
    id: String,
    raw_id: Option<Box<RawValue>>,
    method: String,
    params: Option<Box<RawValue>>,
    behind_proxy: bool,
    meta: Arc<RequestMeta>,
}

impl Parameters {
    pub(crate) const fn new(
        id: String,
        raw_id: Option<Box<RawValue>>,
        method: String,
        params: Option<Box<RawValue>>,
        behind_proxy: bool,
        meta: Arc<RequestMeta>,
    ) -> Self {
        Self {
            id,
            raw_id,
            method,
            params,
            behind_proxy,
            meta,
        }
    }

    /// The normalized request id. `"null"` for notifications and `null` ids.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The request id exactly as it appeared on the wire.
    pub fn raw_id(&self) -> Option<&RawValue> {
        self.raw_id.as_deref()
    }

    /// True if the call is a notification. Its result is discarded.
    pub const fn is_notification(&self) -> bool {
        self.raw_id.is_none()
    }

    /// The method name requested by the client. In proxy mode this is the
    /// original name, not the proxy handler's.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw `params` member, if any.
    pub fn raw_params(&self) -> Option<&RawValue> {
        self.params.as_deref()
    }

    /// Deserialize the `params` member.
    ///
    /// Fails with [`ErrorPayload::invalid_params`] if the member is missing
    /// or has the wrong shape.
    pub fn deser_params<T: RpcRecv>(&self) -> Result<T, ErrorPayload> {
        let raw = self.raw_params().map_or("null", RawValue::get);
        serde_json::from_str(raw).map_err(|err| ErrorPayload::invalid_params().with_detail(err))
    }

    /// Deserialize positional (array) `params` into a list of `T`.
    pub fn positional<T: RpcRecv>(&self) -> Result<Vec<T>, ErrorPayload> {
        self.deser_params()
    }

    /// Deserialize the positional parameter at `index`.
    pub fn positional_at<T: RpcRecv>(&self, index: usize) -> Result<T, ErrorPayload> {
        let params = self.positional::<Box<RawValue>>()?;
        let raw = params.get(index).ok_or_else(|| {
            ErrorPayload::invalid_params().with_detail(format!("missing parameter {index}"))
        })?;
        serde_json::from_str(raw.get())
            .map_err(|err| ErrorPayload::invalid_params().with_detail(err))
    }

    /// The client address. Taken from `X-Real-IP`/`X-Client-IP` when the
    /// service is behind a reverse proxy, otherwise from the transport peer.
    pub fn remote_address(&self) -> Option<IpAddr> {
        addr::client_ip(self.headers(), self.meta.peer, self.behind_proxy)
    }

    /// The transport peer. `None` on unix sockets.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.meta.peer
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.meta.parts.headers
    }

    fn header_str(&self, name: header::HeaderName) -> Option<&str> {
        self.headers().get(name).and_then(|value| value.to_str().ok())
    }

    /// The `User-Agent` header.
    pub fn user_agent(&self) -> Option<&str> {
        self.header_str(header::USER_AGENT)
    }

    /// The `Referer` header.
    pub fn referer(&self) -> Option<&str> {
        self.header_str(header::REFERER)
    }

    /// The host the client addressed. See [`addr::host`].
    pub fn host(&self) -> Option<String> {
        addr::host(self.headers(), self.uri())
    }

    /// The `Content-Length` header.
    pub fn content_length(&self) -> Option<u64> {
        self.header_str(header::CONTENT_LENGTH)
            .and_then(|value| value.trim().parse().ok())
    }

    /// Cookies sent with the request, as name/value pairs.
    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.split_once('=')?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name, value.trim().trim_matches('"')))
            })
    }

    /// Look up a single cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Basic credentials sent with the request.
    pub fn basic_auth(&self) -> Option<(String, String)> {
        auth::basic_credentials(self.headers())
    }

    /// The HTTP request method.
    pub fn http_method(&self) -> &http::Method {
        &self.meta.parts.method
    }

    /// The HTTP protocol version.
    pub fn version(&self) -> Version {
        self.meta.parts.version
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.meta.parts.uri
    }
}
