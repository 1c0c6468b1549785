//! Request and response hooks.
//!
//! Hooks see raw body bytes only. They run after the request body is read
//! and before the response body is written, and may abort the request with
//! a [`HookError`].

use bytes::Bytes;
use http::StatusCode;
use std::{fmt, sync::Arc};

/// Error returned by a hook to abort processing.
///
/// The abort is reported to the client as a bare HTTP status, with no
/// JSON-RPC body.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
    status: Option<u16>,
}

impl HookError {
    /// Abort with `500 Internal Server Error`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// Abort with a specific HTTP status code.
    pub fn with_status(message: impl Into<String>, status: u16) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The HTTP status reported to the client.
    ///
    /// Only registered status codes are honored. Anything else, including no
    /// annotation at all, becomes `500 Internal Server Error`.
    pub fn status(&self) -> StatusCode {
        self.status
            .and_then(|code| StatusCode::from_u16(code).ok())
            .filter(|code| code.canonical_reason().is_some())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// A hook callable.
pub type HookFn = dyn Fn(&Bytes) -> Result<(), HookError> + Send + Sync;

/// Optional request and response hooks.
#[derive(Clone, Default)]
pub struct Hooks {
    on_request: Option<Arc<HookFn>>,
    on_response: Option<Arc<HookFn>>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .finish()
    }
}

impl Hooks {
    /// Set the hook run on the raw request body.
    pub fn on_request<F>(self, hook: F) -> Self
    where
        F: Fn(&Bytes) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            on_request: Some(Arc::new(hook)),
            ..self
        }
    }

    /// Set the hook run on the raw response body.
    pub fn on_response<F>(self, hook: F) -> Self
    where
        F: Fn(&Bytes) -> Result<(), HookError> + Send + Sync + 'static,
    {
        Self {
            on_response: Some(Arc::new(hook)),
            ..self
        }
    }

    pub(crate) fn run_request(&self, body: &Bytes) -> Result<(), HookError> {
        self.on_request.as_ref().map_or(Ok(()), |hook| hook(body))
    }

    pub(crate) fn run_response(&self, body: &Bytes) -> Result<(), HookError> {
        self.on_response.as_ref().map_or(Ok(()), |hook| hook(body))
    }
}
