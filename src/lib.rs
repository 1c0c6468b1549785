//! jrpc-http: a JSON-RPC 2.0 service engine over HTTP/1.1.
//!
//! A [`Service`] validates each HTTP request, decodes a single JSON-RPC
//! request from the body, dispatches it to a registered handler and writes
//! the JSON-RPC response. It listens on a unix domain socket or on a TCP
//! address with TLS, and can also be mounted in an existing axum app.
//!
//! ## Basic usage
//!
//! Services are built with a [`ServiceBuilder`]. Handlers are async
//! functions, see the [`Handler`] trait.
//!
//! ```no_run
//! use jrpc_http::{ErrorPayload, Parameters, ServiceBuilder};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn _main() -> Result<(), jrpc_http::ServeError> {
//! #[derive(serde::Deserialize)]
//! struct Subtract {
//!     minuend: i64,
//!     subtrahend: i64,
//! }
//!
//! let service = ServiceBuilder::new()
//!     .register("subtract", |p: Subtract| async move {
//!         Ok::<_, ErrorPayload>(p.minuend - p.subtrahend)
//!     })
//!     .register("whoami", |params: Parameters| async move {
//!         Ok::<_, ErrorPayload>(params.remote_address().map(|ip| ip.to_string()))
//!     })
//!     .route("/rpc")
//!     .unix_socket("/run/rpc.sock")
//!     .build();
//!
//! service.serve(CancellationToken::new()).await
//! # }
//! ```
//!
//! ## Request handling
//!
//! Each request goes through the following stages. The first failing stage
//! decides the reply.
//!
//! 1. Authorization, if enabled. Denied requests get a bare `403`.
//! 2. The body is read, and the request hook runs on it.
//! 3. The HTTP version must be 1.1, the method `POST`, and both
//!    `Content-Type` and `Accept` must be `application/json`.
//! 4. The body must be a single JSON-RPC 2.0 request object. Batches are
//!    not supported.
//! 5. The id must be a string or an integer. Requests without an id, or
//!    with a `null` one, are notifications. They are dispatched, but
//!    answered with `204` and no body.
//! 6. The method is dispatched, and the response hook runs on the response
//!    body.
//!
//! Errors found before the id is validated are answered with a `null` id.
//!
//! ## Proxy mode
//!
//! A service built with [`ServiceBuilder::proxy`] sends every call to the
//! single handler set with [`ServiceBuilder::register_proxy`], which can read
//! the requested name from [`Parameters::method`].
//!
//! ## Feature flags
//!
//! - `axum` (default): serve the service with axum, see `Service::into_axum`
//!   and `Service::serve`.
//! - `tls`: TCP+TLS listeners, with `axum-server` and rustls.
//! - `client`: a small call client built on `reqwest`.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

#[macro_use]
pub(crate) mod macros;

pub mod addr;

pub mod auth;
pub use auth::{AuthConfigError, AuthEntry, AuthError, AuthTable};

#[cfg(feature = "axum")]
mod axum;

#[cfg(feature = "client")]
mod client;
#[cfg(feature = "client")]
pub use client::{Client, ClientError, DEFAULT_TIMEOUT};

mod config;
pub use config::ServiceConfig;

mod ctx;

mod error;
pub use error::{ConfigError, ServeError};

mod hook;
pub use hook::{HookError, HookFn, Hooks};

mod pipeline;

mod primitives;
pub use primitives::{RpcRecv, RpcSend};

mod registry;
pub use registry::PROXY_METHOD;

mod routes;
pub use routes::{Handler, OutputResponsePayload, OutputResult, Parameters, RouteFuture};
pub(crate) use routes::Route;

#[cfg(feature = "axum")]
mod serve;

mod service;
pub use service::{Reply, Service, ServiceBuilder};

mod transport;
pub use transport::{sanitize_route, TlsTransport, UnixTransport, DEFAULT_SOCKET_MODE};

pub mod types;
pub use types::{normalize_id, ErrorPayload, ResponsePayload};

/// Re-export of the `tower` crate, primarily to provide [`tower::Service`],
/// and [`tower::service_fn`].
pub use tower;

/// Re-export of the `serde_json` crate, primarily to provide the `RawValue` type.
pub use serde_json::{self, value::RawValue};
