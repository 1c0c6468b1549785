use crate::routes::{Parameters, Route, RouteOutput};
use crate::{ErrorPayload, ResponsePayload};

/// A registered method. Either bound to a handler, or registered by name
/// only.
///
/// Analagous to axum's `MethodEndpoint`
#[derive(Debug)]
pub(crate) enum Method {
    /// A method that is ready to handle requests.
    Ready(Route),
    /// A name with no handler behind it. Calls fail with an internal error.
    Unbound,
}

impl Clone for Method {
    fn clone(&self) -> Self {
        match self {
            Self::Ready(route) => Self::Ready(route.clone()),
            Self::Unbound => Self::Unbound,
        }
    }
}

impl Method {
    /// Call the method with the given parameters.
    pub(crate) async fn call(&self, params: Parameters) -> RouteOutput {
        match self {
            Self::Ready(route) => match route.oneshot_inner(params).await {
                Ok(output) => output,
                Err(never) => match never {},
            },
            Self::Unbound => Ok(ResponsePayload(Err(
                ErrorPayload::internal_error().with_detail("unable to call provided method"),
            ))),
        }
    }
}

// Some code is this file is reproduced under the terms of the MIT license. It
// originates from the `axum` crate. The original source code can be found at
// the following URL, and the original license is included below.
//
// https://github.com/tokio-rs/axum/blob/f84105ae8b078109987b089c47febc3b544e6b80/axum/src/routing/mod.rs#L119
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
