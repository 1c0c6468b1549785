#![allow(dead_code)]

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use jrpc_http::{AuthEntry, ErrorPayload, Parameters, Reply, Service, ServiceBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{value::RawValue, Value};
use std::net::SocketAddr;

pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pwd";

pub const SERVER_ROUTE: &str = "/jrpc";
pub const AUTH_ROUTE: &str = "/auth";
pub const PROXY_ROUTE: &str = "/proxy";

/// Install a subscriber once. Controlled by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Deserialize)]
struct SubtractParams {
    #[serde(rename = "X")]
    x: i64,
    #[serde(rename = "Y")]
    y: i64,
}

/// Subtract `Y` from `X`. Takes named or positional params.
pub async fn subtract(params: Parameters) -> Result<i64, ErrorPayload> {
    let (x, y) = match params.deser_params::<SubtractParams>() {
        Ok(named) => (named.x, named.y),
        Err(_) => {
            let list: Vec<i64> = params.positional()?;
            let [x, y] = list[..] else {
                return Err(ErrorPayload::invalid_params()
                    .with_detail("exactly two integers are required"));
            };
            (x, y)
        }
    };

    if x == 999 && y == 999 {
        return Err(ErrorPayload::new(-320099, "Custom error".into()).with_detail("mock server error"));
    }
    Ok(x - y)
}

/// Always succeeds with a `null` result.
pub async fn update() -> Result<(), ErrorPayload> {
    Ok(())
}

/// Panics.
pub async fn explode() -> Result<(), ErrorPayload> {
    panic!("handler exploded")
}

/// What a handler sees of a call.
#[derive(Debug, Serialize, Deserialize)]
pub struct CallView {
    pub id: String,
    pub method: String,
    pub remote_address: Option<String>,
    pub user_agent: Option<String>,
    pub host: Option<String>,
    pub params: Option<Box<RawValue>>,
}

/// Echo the call back to the client.
pub async fn copy(params: Parameters) -> Result<CallView, ErrorPayload> {
    Ok(CallView {
        id: params.id().to_owned(),
        method: params.method().to_owned(),
        remote_address: params.remote_address().map(|ip| ip.to_string()),
        user_agent: params.user_agent().map(str::to_owned),
        host: params.host(),
        params: params.raw_params().map(RawValue::to_owned),
    })
}

pub fn static_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::SERVER, HeaderValue::from_static("JSON-RPC/2.0 (Rust)"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST"),
    );
    headers
}

/// The general purpose service.
pub fn server_builder() -> ServiceBuilder {
    ServiceBuilder::new()
        .route(SERVER_ROUTE)
        .headers(static_headers())
        .register("subtract", subtract)
        .register("update", update)
        .register("copy", copy)
        .register("panic", explode)
        .register_unbound("nilmethod")
}

pub fn server_service() -> Service {
    server_builder().build()
}

/// A service requiring `user:pwd` from `127.0.0.1`.
pub fn auth_builder() -> ServiceBuilder {
    ServiceBuilder::new()
        .route(AUTH_ROUTE)
        .headers(static_headers())
        .authorization([AuthEntry::new(USERNAME, PASSWORD, ["127.0.0.1/32"]).unwrap()])
        .register("update", update)
        .register("copy", copy)
}

pub fn auth_service() -> Service {
    auth_builder().build()
}

/// A proxy service answering every call with [`copy`].
pub fn proxy_service() -> Service {
    ServiceBuilder::proxy()
        .route(PROXY_ROUTE)
        .register_proxy(copy)
        .build()
}

/// A JSON POST request.
pub fn post(route: &str) -> http::request::Builder {
    http::Request::post(route)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
}

/// A JSON POST request with a body.
pub fn json_request(route: &str, body: &str) -> http::Request<String> {
    post(route).body(body.to_owned()).unwrap()
}

/// Basic credentials header value.
pub fn basic(username: &str, password: &str) -> String {
    use base64::Engine;
    format!(
        "Basic {}",
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"))
    )
}

/// A reply, with the body parsed as JSON.
#[derive(Debug)]
pub struct Answer {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl From<Reply> for Answer {
    fn from(reply: Reply) -> Self {
        let (status, headers, body) = reply.into_parts();
        Self {
            status,
            headers,
            body: body.map(|body: Bytes| serde_json::from_slice(&body).unwrap()),
        }
    }
}

/// Run a request through a service.
pub async fn send<B>(service: &Service, req: http::Request<B>, peer: Option<SocketAddr>) -> Answer
where
    B: http_body::Body,
    B::Error: std::fmt::Display,
{
    service.handle(req, peer).await.into()
}

/// Send a JSON body to a service from `127.0.0.1`.
pub async fn send_json(service: &Service, body: &str) -> Answer {
    let req = json_request(service.route(), body);
    send(service, req, Some(localhost())).await
}

pub fn localhost() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 40000))
}
