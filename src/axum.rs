use crate::{
    routes::RawPayload,
    service::{Reply, Service},
    types::Response,
    ErrorPayload,
};
use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::any,
};
use bytes::Bytes;
use http_body_util::Full;
use std::{any::Any, net::SocketAddr};
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

impl IntoResponse for Reply {
    fn into_response(self) -> axum::response::Response {
        let (status, headers, body) = self.into_parts();
        let body = body.map_or_else(Body::empty, Body::from);
        (status, headers, body).into_response()
    }
}

/// Axum handler for the service route.
async fn handle_rpc(State(service): State<Service>, req: Request) -> Reply {
    // present on TCP listeners only
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    service.handle(req, peer).await
}

/// Turn a handler panic into a JSON-RPC internal error.
fn panic_response(err: Box<dyn Any + Send + 'static>) -> http::Response<Full<Bytes>> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("handler panicked");
    error!(panic = detail, "handler panicked");

    let payload = RawPayload::from(ErrorPayload::internal_error().with_detail("handler panicked"));
    let mut res = http::Response::new(Full::new(Response::build(None, &payload)));
    *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(mime::APPLICATION_JSON.as_ref()),
    );
    res
}

impl Service {
    /// Create an [`axum::Router`] serving this service on its route.
    ///
    /// Requests to other paths are answered with `404 Not Found` by axum.
    /// Handler panics are answered with `500 Internal Server Error` and an
    /// internal error body. The client address is taken from
    /// [`ConnectInfo`] when the router is served with
    /// `into_make_service_with_connect_info::<SocketAddr>()`.
    ///
    /// ```no_run
    /// # use jrpc_http::Service;
    /// # async fn _main(service: Service) {
    /// let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
    /// let app = service.into_axum();
    /// axum::serve(
    ///     listener,
    ///     app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    /// )
    /// .await
    /// .unwrap();
    /// # }
    /// ```
    pub fn into_axum(self) -> axum::Router {
        let route = self.route().to_owned();
        axum::Router::new()
            .route(&route, any(handle_rpc))
            .with_state(self)
            .layer(CatchPanicLayer::custom(panic_response))
    }
}
