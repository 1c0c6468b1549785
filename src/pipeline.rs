//! Request validation and dispatch.
//!
//! Every stage takes the [`RequestCtx`] by value and either hands an updated
//! context to the next stage or rejects the request. A rejection carries the
//! status to reply with and the JSON-RPC error for the body. Rejections before
//! the id has been validated are answered with a `null` id.

use crate::{
    ctx::RequestCtx,
    registry::Registry,
    routes::{Parameters, RawPayload},
    types::{codes::JSONRPC_VERSION, normalize_id, Decoded, Request, Response},
    ErrorPayload,
};
use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode, Version};
use std::fmt;
use tracing::{debug, Span};

const APPLICATION_JSON: &str = "application/json";

/// The result of running a request through the pipeline.
#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) ctx: RequestCtx,
    /// Serialized response envelope. Empty for notifications.
    pub(crate) body: Bytes,
}

/// A stage refused to go on.
#[derive(Debug)]
struct Rejection {
    ctx: RequestCtx,
    error: ErrorPayload,
}

impl Rejection {
    const fn new(ctx: RequestCtx, error: ErrorPayload) -> Self {
        Self { ctx, error }
    }

    fn into_outcome(self) -> Outcome {
        record_error(&self.error);
        let body = Response::build(None, &RawPayload::from(self.error));
        Outcome {
            ctx: self.ctx,
            body,
        }
    }
}

/// Record the error members on the request span.
fn record_error(error: &ErrorPayload) {
    let span = Span::current();
    span.record("rpc.jsonrpc.error_code", error.code);
    span.record("rpc.jsonrpc.error_message", &*error.message);
}

/// Outcome for a request whose body could not be read.
pub(crate) fn unreadable(ctx: RequestCtx, err: impl fmt::Display) -> Outcome {
    debug!(%err, "failed to read request body");
    Rejection::new(
        ctx.with_status(StatusCode::BAD_REQUEST),
        ErrorPayload::parse_error().with_detail(err),
    )
    .into_outcome()
}

/// HTTP/1.1 only.
fn check_version(ctx: RequestCtx) -> Result<RequestCtx, Rejection> {
    if ctx.meta().parts.version == Version::HTTP_11 {
        return Ok(ctx);
    }
    Err(Rejection::new(
        ctx.with_status(StatusCode::NOT_IMPLEMENTED),
        ErrorPayload::invalid_request().with_detail("request protocol version must be HTTP/1.1"),
    ))
}

/// POST only.
fn check_method(ctx: RequestCtx) -> Result<RequestCtx, Rejection> {
    if ctx.meta().parts.method == Method::POST {
        return Ok(ctx);
    }
    Err(Rejection::new(
        ctx.with_status(StatusCode::METHOD_NOT_ALLOWED)
            .with_header(header::ALLOW, HeaderValue::from_static("POST")),
        ErrorPayload::invalid_request().with_detail("request method must be of POST type"),
    ))
}

/// True if the header is exactly `application/json`, in any case.
fn is_json(ctx: &RequestCtx, name: header::HeaderName) -> bool {
    ctx.meta()
        .parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case(APPLICATION_JSON))
}

/// `Content-Type` and `Accept` must both be JSON.
fn check_headers(ctx: RequestCtx) -> Result<RequestCtx, Rejection> {
    if !is_json(&ctx, header::CONTENT_TYPE) {
        return Err(Rejection::new(
            ctx.with_status(StatusCode::UNSUPPORTED_MEDIA_TYPE),
            ErrorPayload::parse_error()
                .with_detail("Content-Type header must be set to 'application/json'"),
        ));
    }
    if !is_json(&ctx, header::ACCEPT) {
        return Err(Rejection::new(
            ctx.with_status(StatusCode::NOT_ACCEPTABLE),
            ErrorPayload::parse_error().with_detail("Accept header must be set to 'application/json'"),
        ));
    }
    Ok(ctx)
}

/// Decode the body into a single request.
fn decode(ctx: RequestCtx, body: &[u8]) -> Result<(RequestCtx, Request), Rejection> {
    let error = match Request::decode(body) {
        Decoded::Ok(req) => return Ok((ctx, req)),
        Decoded::Batch => {
            ErrorPayload::not_implemented().with_detail("batch requests not supported")
        }
        Decoded::FieldType(field) => {
            ErrorPayload::invalid_method().with_detail(format!("{field} data type must be string"))
        }
        Decoded::Malformed(err) => ErrorPayload::parse_error().with_detail(err),
    };
    Err(Rejection::new(ctx, error))
}

/// The `jsonrpc` member must be exactly `"2.0"`.
fn check_jsonrpc(ctx: RequestCtx, req: &Request) -> Result<RequestCtx, Rejection> {
    if req.jsonrpc == JSONRPC_VERSION {
        return Ok(ctx);
    }
    Err(Rejection::new(
        ctx.with_status(StatusCode::BAD_REQUEST),
        ErrorPayload::invalid_request()
            .with_detail(format!("jsonrpc request member must be exactly '{JSONRPC_VERSION}'")),
    ))
}

/// Normalize the id. Requests without one become notifications.
fn identify(ctx: RequestCtx, req: &Request) -> Result<(RequestCtx, String), Rejection> {
    let id = match normalize_id(req.id.as_deref()) {
        Ok(id) => id,
        Err(err) => return Err(Rejection::new(ctx, err)),
    };
    Span::current().record("rpc.jsonrpc.request_id", id.as_str());

    let ctx = if req.is_notification() {
        ctx.into_notification()
    } else {
        ctx
    };
    Ok((ctx, id))
}

/// Run the validation stages, then dispatch.
pub(crate) async fn run(ctx: RequestCtx, registry: &Registry, body: &[u8]) -> Outcome {
    let validated = check_version(ctx)
        .and_then(check_method)
        .and_then(check_headers)
        .and_then(|ctx| decode(ctx, body))
        .and_then(|(ctx, req)| {
            let ctx = check_jsonrpc(ctx, &req)?;
            let (ctx, id) = identify(ctx, &req)?;
            Ok((ctx, req, id))
        });

    match validated {
        Ok((ctx, req, id)) => dispatch(ctx, registry, req, id).await,
        Err(rejection) => rejection.into_outcome(),
    }
}

/// Call the method and assemble the response.
async fn dispatch(ctx: RequestCtx, registry: &Registry, req: Request, id: String) -> Outcome {
    let Request {
        method,
        params,
        id: raw_id,
        ..
    } = req;
    Span::current().record("rpc.method", method.as_str());

    let params = Parameters::new(
        id,
        raw_id.clone(),
        method,
        params,
        ctx.behind_proxy(),
        ctx.meta().clone(),
    );
    let output = registry.call(params).await;

    if ctx.is_notification() {
        return Outcome {
            ctx,
            body: Bytes::new(),
        };
    }

    let body = match output {
        Ok(payload) => {
            if let Some(error) = payload.as_error() {
                record_error(error);
            }
            Response::build(raw_id.as_deref(), &payload)
        }
        Err(err) => {
            debug!(%err, "failed to serialize handler output");
            Response::serialization_failure()
        }
    };
    Outcome { ctx, body }
}
