mod future;
pub use future::RouteFuture;

mod handler;
pub(crate) use handler::HandlerInternal;
pub use handler::{Handler, OutputResponsePayload, OutputResult};

mod method;
pub(crate) use method::Method;

mod params;
pub use params::Parameters;

use crate::ResponsePayload;
use serde_json::value::RawValue;
use std::{
    convert::Infallible,
    task::{Context, Poll},
};
use tower::{util::BoxCloneSyncService, Service, ServiceExt};
use tracing::{debug_span, enabled, Level};

/// A handler result with both the payload and error data serialized.
pub(crate) type RawPayload = ResponsePayload<Box<RawValue>, Box<RawValue>>;

/// The output of a [`Route`]. An `Err` means the handler's result could not
/// be serialized.
pub(crate) type RouteOutput = serde_json::Result<RawPayload>;

/// A JSON-RPC handler for a specific method.
///
/// A route is a [`BoxCloneSyncService`] that takes [`Parameters`] and
/// produces a serialized payload. Routes are infallible. Any error that
/// occurs during the handling of a request is represented in the payload.
#[derive(Debug)]
pub(crate) struct Route(BoxCloneSyncService<Parameters, RouteOutput, Infallible>);

impl Route {
    /// Create a new route from a service.
    pub(crate) fn new<S>(inner: S) -> Self
    where
        S: Service<Parameters, Response = RouteOutput, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self(BoxCloneSyncService::new(inner))
    }

    /// Create a one-shot future for the given call.
    pub(crate) fn oneshot_inner(&self, params: Parameters) -> RouteFuture {
        RouteFuture::new(self.0.clone().oneshot(params))
    }
}

impl Clone for Route {
    #[track_caller]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl Service<Parameters> for Route {
    type Response = RouteOutput;

    type Error = Infallible;

    type Future = RouteFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, params: Parameters) -> Self::Future {
        let span = debug_span!(
            "Route::call",
            method = params.method(),
            notification = params.is_notification(),
            params = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );
        if enabled!(Level::TRACE) {
            if let Some(raw) = params.raw_params() {
                span.record("params", raw.get());
            }
        }
        self.oneshot_inner(params).with_span(span)
    }
}

// Some code is this file is reproduced under the terms of the MIT license. It
// originates from the `axum` crate. The original source code can be found at
// the following URL, and the original license is included below.
//
// https://github.com/tokio-rs/axum/
//
// The MIT License (MIT)
//
// Copyright (c) 2019 Axum Contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.
