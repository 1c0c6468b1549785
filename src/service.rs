use crate::{
    addr,
    auth::{self, AuthConfigError, AuthEntry, AuthTable},
    ctx::{RequestCtx, RequestMeta, Snapshot},
    hook::{HookError, Hooks},
    pipeline::{self, Outcome},
    registry::Registry,
    transport::{sanitize_route, Settings, TlsTransport, UnixTransport, DEFAULT_SOCKET_MODE},
    Handler,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use http_body_util::{BodyExt, Full};
use parking_lot::Mutex;
use std::{
    fmt,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{atomic::AtomicU32, Arc},
};
use tracing::{debug, debug_span, error, Instrument};

/// Builder for a [`Service`].
///
/// Methods, transports and hooks are fixed once the service is built. Static
/// headers and authorization entries may still be changed on the built
/// service.
///
/// ```no_run
/// use jrpc_http::{ErrorPayload, ServiceBuilder};
///
/// let service = ServiceBuilder::new()
///     .register("double", |n: u64| async move { Ok::<_, ErrorPayload>(n * 2) })
///     .route("/rpc")
///     .unix_socket("/tmp/rpc.sock")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct ServiceBuilder {
    registry: Registry,
    route: String,
    unix: Option<PathBuf>,
    socket_mode: Option<u32>,
    tls: Option<TlsTransport>,
    behind_proxy: bool,
    headers: HeaderMap,
    hooks: Hooks,
    auth: Option<AuthTable>,
}

impl ServiceBuilder {
    /// Create a builder for a regular service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for a proxy service. A proxy service sends every
    /// call to the handler set with [`Self::register_proxy`].
    pub fn proxy() -> Self {
        Self {
            registry: Registry::proxy(),
            ..Self::default()
        }
    }

    /// Register a handler for a method. Registering the same name again
    /// replaces the handler. Ignored on proxy services.
    pub fn register<H, T>(mut self, name: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T>,
        T: Send + 'static,
    {
        self.registry.register(name, handler);
        self
    }

    /// Register a method name with no handler. Calls to it fail with an
    /// internal error. Ignored on proxy services.
    pub fn register_unbound(mut self, name: impl Into<String>) -> Self {
        self.registry.register_unbound(name);
        self
    }

    /// Set the handler of a proxy service. Ignored on regular services.
    pub fn register_proxy<H, T>(mut self, handler: H) -> Self
    where
        H: Handler<T>,
        T: Send + 'static,
    {
        self.registry.register_proxy(handler);
        self
    }

    /// Set the HTTP route. See [`sanitize_route`].
    pub fn route(self, route: &str) -> Self {
        Self {
            route: sanitize_route(route),
            ..self
        }
    }

    /// Listen on a unix domain socket.
    pub fn unix_socket(self, path: impl Into<PathBuf>) -> Self {
        Self {
            unix: Some(path.into()),
            ..self
        }
    }

    /// Permission bits of the unix socket file. Defaults to
    /// [`DEFAULT_SOCKET_MODE`].
    pub fn unix_socket_mode(self, mode: u32) -> Self {
        Self {
            socket_mode: Some(mode),
            ..self
        }
    }

    /// Listen on a TCP address with TLS, using PEM certificate and key files.
    pub fn tcp_tls(
        self,
        addr: SocketAddr,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tls: Some(TlsTransport {
                addr,
                cert: cert.into(),
                key: key.into(),
            }),
            ..self
        }
    }

    /// Replace the static response headers.
    pub fn headers(self, headers: HeaderMap) -> Self {
        Self { headers, ..self }
    }

    /// Add a static response header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Take the client address from `X-Real-IP` or `X-Client-IP` instead of
    /// the transport peer.
    pub fn behind_reverse_proxy(self, behind_proxy: bool) -> Self {
        Self {
            behind_proxy,
            ..self
        }
    }

    /// Set the request hook. It sees the raw request body before it is
    /// decoded.
    pub fn on_request<F>(self, hook: F) -> Self
    where
        F: Fn(&Bytes) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            hooks: self.hooks.on_request(hook),
            ..self
        }
    }

    /// Set the response hook. It sees the raw response body before it is
    /// written. Not run for notifications.
    pub fn on_response<F>(self, hook: F) -> Self
    where
        F: Fn(&Bytes) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            hooks: self.hooks.on_response(hook),
            ..self
        }
    }

    /// Enable authorization and add entries. Once enabled, requests without
    /// matching credentials are refused.
    pub fn authorization(mut self, entries: impl IntoIterator<Item = AuthEntry>) -> Self {
        self.auth.get_or_insert_with(AuthTable::new).extend(entries);
        self
    }

    /// Enable authorization and add entries parsed from text. Nothing is
    /// added if any line is invalid.
    pub fn authorization_from_str(self, text: &str) -> Result<Self, AuthConfigError> {
        Ok(self.authorization(AuthTable::parse(text)?))
    }

    /// Enable authorization and add entries read from a file. Nothing is
    /// added if any line is invalid.
    pub fn authorization_from_file(self, path: impl AsRef<Path>) -> Result<Self, AuthConfigError> {
        Ok(self.authorization(AuthTable::read_file(path)?))
    }

    /// Build the service.
    pub fn build(self) -> Service {
        let settings = Settings {
            route: if self.route.is_empty() {
                sanitize_route(&self.route)
            } else {
                self.route
            },
            unix: self.unix.map(|path| UnixTransport {
                path,
                mode: self.socket_mode.unwrap_or(DEFAULT_SOCKET_MODE),
            }),
            tls: self.tls,
            behind_proxy: self.behind_proxy,
        };

        Service {
            inner: Arc::new(ServiceInner {
                registry: self.registry,
                hooks: self.hooks,
                settings: Arc::new(settings),
                headers: Mutex::new(Arc::new(self.headers)),
                auth: Mutex::new(self.auth.map(Arc::new)),
                rx_msg_id: AtomicU32::new(0),
                tx_msg_id: AtomicU32::new(0),
            }),
        }
    }
}

#[derive(Debug)]
struct ServiceInner {
    registry: Registry,
    hooks: Hooks,
    settings: Arc<Settings>,
    headers: Mutex<Arc<HeaderMap>>,
    auth: Mutex<Option<Arc<AuthTable>>>,

    /// Counter for OTEL messages received.
    rx_msg_id: AtomicU32,
    /// Counter for OTEL messages sent.
    tx_msg_id: AtomicU32,
}

/// A JSON-RPC 2.0 over HTTP service.
///
/// Cheap to clone. All clones share the same configuration. Serve it with
/// [`Service::serve`], mount it in an axum app with `Service::into_axum`, or
/// drive it directly with [`Service::handle`].
#[derive(Debug, Clone)]
pub struct Service {
    inner: Arc<ServiceInner>,
}

impl Service {
    /// Shortcut for [`ServiceBuilder::new`].
    pub fn builder() -> ServiceBuilder {
        ServiceBuilder::new()
    }

    /// The HTTP route the service answers on.
    pub fn route(&self) -> &str {
        &self.inner.settings.route
    }

    /// The unix socket listener, if configured.
    pub fn unix_socket(&self) -> Option<&UnixTransport> {
        self.inner.settings.unix.as_ref()
    }

    /// The TLS listener, if configured.
    pub fn tls(&self) -> Option<&TlsTransport> {
        self.inner.settings.tls.as_ref()
    }

    /// True if client addresses come from reverse proxy headers.
    pub fn behind_reverse_proxy(&self) -> bool {
        self.inner.settings.behind_proxy
    }

    /// True if this is a proxy service.
    pub fn is_proxy(&self) -> bool {
        self.inner.registry.is_proxy()
    }

    /// The current static response headers.
    pub fn headers(&self) -> Arc<HeaderMap> {
        self.inner.headers.lock().clone()
    }

    /// Replace the static response headers. Requests already in flight keep
    /// the headers they started with.
    pub fn set_headers(&self, headers: HeaderMap) {
        *self.inner.headers.lock() = Arc::new(headers);
    }

    /// The current authorization table. `None` if authorization is disabled.
    pub fn authorization(&self) -> Option<Arc<AuthTable>> {
        self.inner.auth.lock().clone()
    }

    /// Enable authorization and add entries. Requests already in flight are
    /// checked against the table they started with.
    pub fn add_authorization(&self, entries: impl IntoIterator<Item = AuthEntry>) {
        let mut guard = self.inner.auth.lock();
        let mut table = guard.as_deref().cloned().unwrap_or_default();
        table.extend(entries);
        *guard = Some(Arc::new(table));
    }

    /// Enable authorization and add entries parsed from text. Nothing is
    /// added if any line is invalid.
    pub fn add_authorization_from_str(&self, text: &str) -> Result<(), AuthConfigError> {
        self.add_authorization(AuthTable::parse(text)?);
        Ok(())
    }

    /// Enable authorization and add entries read from a file. Nothing is
    /// added if any line is invalid.
    pub fn add_authorization_from_file(&self, path: impl AsRef<Path>) -> Result<(), AuthConfigError> {
        self.add_authorization(AuthTable::read_file(path)?);
        Ok(())
    }

    pub(crate) fn settings(&self) -> &Arc<Settings> {
        &self.inner.settings
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            settings: self.inner.settings.clone(),
            headers: self.headers(),
            auth: self.authorization(),
        }
    }

    /// Check the request against the authorization table of its snapshot.
    async fn authorize(&self, ctx: &RequestCtx) -> bool {
        let Some(table) = ctx.auth().cloned() else {
            return true;
        };
        let headers = &ctx.meta().parts.headers;
        let credentials = auth::basic_credentials(headers);
        let client_ip = addr::client_ip(headers, ctx.meta().peer, ctx.behind_proxy());

        // bcrypt is slow on purpose
        let verdict = tokio::task::spawn_blocking(move || {
            let credentials = credentials
                .as_ref()
                .map(|(user, secret)| (user.as_str(), secret.as_str()));
            table.check(credentials, client_ip)
        })
        .await;

        match verdict {
            Ok(Ok(())) => true,
            Ok(Err(err)) => {
                debug!(%err, "request denied");
                false
            }
            Err(err) => {
                error!(%err, "authorization task failed");
                false
            }
        }
    }

    /// Handle one HTTP request.
    ///
    /// `peer` is the transport peer address, `None` for unix sockets.
    pub async fn handle<B>(&self, req: http::Request<B>, peer: Option<SocketAddr>) -> Reply
    where
        B: http_body::Body,
        B::Error: fmt::Display,
    {
        let span = debug_span!(
            "Service::handle",
            "otel.kind" = "server",
            "rpc.system" = "jsonrpc",
            "rpc.jsonrpc.version" = "2.0",
            "rpc.method" = tracing::field::Empty,
            "rpc.jsonrpc.request_id" = tracing::field::Empty,
            "rpc.jsonrpc.error_code" = tracing::field::Empty,
            "rpc.jsonrpc.error_message" = tracing::field::Empty,
        );
        self.handle_inner(req, peer).instrument(span).await
    }

    async fn handle_inner<B>(&self, req: http::Request<B>, peer: Option<SocketAddr>) -> Reply
    where
        B: http_body::Body,
        B::Error: fmt::Display,
    {
        let (parts, body) = req.into_parts();
        let ctx = RequestCtx::new(self.snapshot(), RequestMeta { parts, peer });

        if !self.authorize(&ctx).await {
            return Reply::bare(StatusCode::FORBIDDEN);
        }

        let Outcome { ctx, body } = match body.collect().await {
            Ok(collected) => {
                let body = collected.to_bytes();
                message_event!(@received, counter: self.inner.rx_msg_id, bytes: body.len(),);

                if let Err(err) = self.inner.hooks.run_request(&body) {
                    debug!(%err, "request hook aborted");
                    return Reply::bare(err.status());
                }

                pipeline::run(ctx, &self.inner.registry, &body).await
            }
            Err(err) => pipeline::unreadable(ctx, err),
        };

        if ctx.is_notification() {
            return Reply {
                status: ctx.status(),
                headers: ctx.response_headers(),
                body: None,
            };
        }

        if let Err(err) = self.inner.hooks.run_response(&body) {
            debug!(%err, "response hook aborted");
            return Reply {
                status: err.status(),
                headers: ctx.response_headers(),
                body: None,
            };
        }

        message_event!(@sent, counter: self.inner.tx_msg_id, bytes: body.len(),);

        Reply {
            status: ctx.status(),
            headers: ctx.response_headers(),
            body: Some(body),
        }
    }
}

/// The HTTP response to a request handled by a [`Service`].
#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Bytes>,
}

impl Reply {
    /// A reply with a status only.
    pub(crate) fn bare(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// The HTTP status.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The response headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body. `None` for notifications, authorization denials
    /// and hook aborts.
    pub const fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Decompose into status, headers and body.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Option<Bytes>) {
        (self.status, self.headers, self.body)
    }
}

impl From<Reply> for http::Response<Full<Bytes>> {
    fn from(reply: Reply) -> Self {
        let (status, headers, body) = reply.into_parts();
        let mut res = http::Response::new(Full::new(body.unwrap_or_default()));
        *res.status_mut() = status;
        *res.headers_mut() = headers;
        res
    }
}
