//! A minimal JSON-RPC 2.0 over HTTP client.
//!
//! ```no_run
//! # async fn _main() -> Result<(), jrpc_http::ClientError> {
//! use jrpc_http::Client;
//!
//! let client = Client::new("https://rpc.example/api").with_basic_auth("alice", "secret");
//! let difference: i64 = client.call_as("subtract", [42, 23]).await?;
//! # Ok(())
//! # }
//! ```

use crate::{types::codes::JSONRPC_VERSION, ErrorPayload, RpcRecv};
use base64::{engine::general_purpose::STANDARD, Engine};
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const USER_AGENT: &str = concat!("jrpc-http/", env!("CARGO_PKG_VERSION"));

/// Errors making a call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request failed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The server answered with a status other than `200 OK`.
    #[error("HTTP status code must be 200, got {0}")]
    Status(StatusCode),
    /// The response is not a JSON-RPC response.
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    /// The response has a different protocol version.
    #[error("response protocol version {0:?} does not equal '2.0'")]
    Version(String),
    /// The response id does not echo the request id.
    #[error("request id {sent} does not equal response id {received}")]
    IdMismatch {
        /// The id sent with the request.
        sent: String,
        /// The id in the response.
        received: String,
    },
    /// The server returned a JSON-RPC error.
    #[error(transparent)]
    Rpc(ErrorPayload),
}

#[derive(Serialize)]
struct Call<'a, P> {
    jsonrpc: &'static str,
    method: &'a str,
    params: P,
    id: &'a str,
}

#[derive(Deserialize)]
struct Envelope {
    jsonrpc: String,
    #[serde(default)]
    result: Option<Box<RawValue>>,
    #[serde(default)]
    error: Option<ErrorPayload>,
    #[serde(default)]
    id: Option<String>,
}

/// A JSON-RPC 2.0 over HTTP client.
///
/// Every call carries a fresh UUID v4 id, which the response must echo.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    url: String,
    headers: HeaderMap,
    timeout: Duration,
}

impl Client {
    /// Create a client for the service at `url`.
    pub fn new(url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));

        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            headers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Use a preconfigured [`reqwest::Client`], e.g. one that trusts a
    /// private CA.
    pub fn with_http_client(self, http: reqwest::Client) -> Self {
        Self { http, ..self }
    }

    /// Send Basic credentials with every call.
    pub fn with_basic_auth(self, username: &str, secret: &str) -> Self {
        let encoded = STANDARD.encode(format!("{username}:{secret}"));
        match HeaderValue::try_from(format!("Basic {encoded}")) {
            Ok(value) => self.with_header(header::AUTHORIZATION, value),
            // base64 output is always a valid header value
            Err(_) => self,
        }
    }

    /// Send a header with every call. Replaces an existing header of the
    /// same name.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the timeout of each call.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Call `method` and return the raw `result` member.
    #[instrument(skip(self, params), fields(url = %self.url))]
    pub async fn call<P>(&self, method: &str, params: P) -> Result<Box<RawValue>, ClientError>
    where
        P: Serialize,
    {
        let id = uuid::Uuid::new_v4().to_string();
        let call = Call {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
            id: &id,
        };
        let body = serde_json::to_vec(&call)?;

        let res = self
            .http
            .post(&self.url)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .body(body)
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            debug!(%status, "unexpected status");
            return Err(ClientError::Status(status));
        }

        let envelope: Envelope = serde_json::from_slice(&res.bytes().await?)?;
        envelope.into_result(&id)
    }

    /// Call `method` and deserialize the `result` member.
    pub async fn call_as<P, R>(&self, method: &str, params: P) -> Result<R, ClientError>
    where
        P: Serialize,
        R: RpcRecv,
    {
        let raw = self.call(method, params).await?;
        Ok(serde_json::from_str(raw.get())?)
    }
}

impl Envelope {
    fn into_result(self, sent: &str) -> Result<Box<RawValue>, ClientError> {
        if self.jsonrpc != JSONRPC_VERSION {
            return Err(ClientError::Version(self.jsonrpc));
        }

        match (self.id, self.error) {
            // errors raised before the id was read carry a null id
            (None, Some(error)) => Err(ClientError::Rpc(error)),
            (Some(received), _) if !received.eq_ignore_ascii_case(sent) => {
                Err(ClientError::IdMismatch {
                    sent: sent.to_owned(),
                    received,
                })
            }
            (None, None) => Err(ClientError::IdMismatch {
                sent: sent.to_owned(),
                received: "null".to_owned(),
            }),
            (Some(_), Some(error)) => Err(ClientError::Rpc(error)),
            (Some(_), None) => Ok(self
                .result
                .unwrap_or_else(|| RawValue::NULL.to_owned())),
        }
    }
}
