use crate::{auth::AuthTable, transport::Settings};
use http::{
    header::{self, HeaderValue},
    request::Parts,
    HeaderMap, HeaderName, StatusCode,
};
use std::{net::SocketAddr, sync::Arc};

/// Transport facts about the request being served.
#[derive(Debug)]
pub(crate) struct RequestMeta {
    /// Request line and headers.
    pub(crate) parts: Parts,
    /// Transport peer. `None` on unix sockets.
    pub(crate) peer: Option<SocketAddr>,
}

/// Service configuration copied at the start of a request. Later changes to
/// the service are not observed by requests already in flight.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub(crate) settings: Arc<Settings>,
    pub(crate) headers: Arc<HeaderMap>,
    pub(crate) auth: Option<Arc<AuthTable>>,
}

/// Per-request context.
///
/// Never shared between requests, and never mutated in place: each stage
/// that changes the outcome returns a new context.
#[derive(Debug, Clone)]
pub(crate) struct RequestCtx {
    status: StatusCode,
    headers: HeaderMap,
    notification: bool,
    config: Snapshot,
    meta: Arc<RequestMeta>,
}

impl RequestCtx {
    pub(crate) fn new(config: Snapshot, meta: RequestMeta) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            notification: false,
            config,
            meta: Arc::new(meta),
        }
    }

    /// Replace the response status.
    pub(crate) fn with_status(self, status: StatusCode) -> Self {
        Self { status, ..self }
    }

    /// Add a dynamic response header. Dynamic headers override static ones.
    pub(crate) fn with_header(self, name: HeaderName, value: HeaderValue) -> Self {
        let mut headers = self.headers;
        headers.insert(name, value);
        Self { headers, ..self }
    }

    /// Mark the request as a notification. Notifications are answered with
    /// `204 No Content` and no body.
    pub(crate) fn into_notification(self) -> Self {
        Self {
            notification: true,
            status: StatusCode::NO_CONTENT,
            ..self
        }
    }

    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) const fn is_notification(&self) -> bool {
        self.notification
    }

    pub(crate) fn behind_proxy(&self) -> bool {
        self.config.settings.behind_proxy
    }

    pub(crate) fn auth(&self) -> Option<&Arc<AuthTable>> {
        self.config.auth.as_ref()
    }

    pub(crate) fn meta(&self) -> &Arc<RequestMeta> {
        &self.meta
    }

    /// Headers of the outgoing response: static service headers, then
    /// dynamic headers, then the JSON content type.
    pub(crate) fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::clone(&self.config.headers);
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
    }
}
