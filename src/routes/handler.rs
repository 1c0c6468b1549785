use crate::{
    routes::{Parameters, RawPayload, RouteOutput},
    ErrorPayload, ResponsePayload, Route, RpcRecv, RpcSend,
};
use std::{convert::Infallible, future::Future, marker::PhantomData, pin::Pin, task};

/// Deserialize handler params, or return an invalid params payload.
macro_rules! deser_or_return {
    ($params:expr) => {{
        match $params.deser_params() {
            Ok(input) => input,
            Err(err) => return Ok(RawPayload::from(err)),
        }
    }};
}

type BoxedOutput = Pin<Box<dyn Future<Output = RouteOutput> + Send>>;

/// Marker type used for differentiating certain handler impls.
#[allow(missing_debug_implementations, unreachable_pub)]
pub struct PhantomParams<T>(PhantomData<T>);

/// A trait describing handlers for JSON-RPC methods.
///
/// Handlers are async functions that receive the call and resolve to either a
/// `Result<T, ErrorPayload<E>>` or a [`ResponsePayload<T, E>`]. The `Ok`
/// value becomes the `result` member of the response, the error becomes the
/// `error` member with its code, message and data untouched.
///
/// ```
/// use jrpc_http::{ErrorPayload, Parameters, ResponsePayload};
///
/// // Typed params. Params that fail to deserialize are answered with an
/// // invalid params error before the handler runs.
/// let double = |n: u64| async move { Ok::<_, ErrorPayload>(n * 2) };
///
/// // The full call view, for access to headers, the client address and the
/// // raw params.
/// let whoami = |params: Parameters| async move {
///     Ok::<_, ErrorPayload>(params.remote_address().map(|ip| ip.to_string()))
/// };
///
/// // Application-defined error codes.
/// let fail = || async {
///     ResponsePayload::<(), ()>::error(-32099, "Custom error".into())
/// };
/// ```
///
/// ### Handler return type inference
///
/// Handlers that always succeed or always fail leave a type parameter
/// unconstrained. Add a turbofish to the return value:
///
/// ```
/// # use jrpc_http::{ErrorPayload, ResponsePayload};
/// let handler_a = || async { Ok::<_, ErrorPayload>(1) };
/// let handler_b = || async { Err::<(), ErrorPayload>(ErrorPayload::internal_error()) };
/// let handler_c = || async { ResponsePayload::<_, ()>::success(3) };
/// ```
///
/// ## Blanket Implementations
///
/// This trait is blanket implemented for the following function and closure
/// types, where `Fut` is a [`Future`] returning either [`ResponsePayload`] or
/// [`Result`]:
///
/// - `async fn() -> Fut`
/// - `async fn(Parameters) -> Fut`
/// - `async fn(Input) -> Fut`
/// - `async fn(Parameters, Input) -> Fut`
///
/// The `T` type parameter is a **marker** and never needs be constructed. It
/// exists so that the trait can be blanket implemented for many different
/// function types.
pub trait Handler<T>: Clone + Send + Sync + Sized + 'static {
    /// The future returned by the handler.
    type Future: Future<Output = RouteOutput> + Send + 'static;

    /// Call the handler.
    fn call(self, params: Parameters) -> Self::Future;
}

/// Extension trait for [`Handler`]s.
pub(crate) trait HandlerInternal<T>: Handler<T> {
    /// Convert the handler into a [`Route`], ready for registration.
    #[allow(private_interfaces)]
    fn into_route(self) -> Route
    where
        T: Send + 'static,
    {
        Route::new(HandlerService::new(self))
    }
}

impl<T, H> HandlerInternal<T> for H where H: Handler<T> {}

/// A [`Handler`] as a tower service.
#[derive(Debug)]
pub(crate) struct HandlerService<H, T> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<H, T> Clone for HandlerService<H, T>
where
    H: Clone,
{
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H, T> HandlerService<H, T> {
    pub(crate) const fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<H, T> tower::Service<Parameters> for HandlerService<H, T>
where
    H: Handler<T>,
    T: Send + 'static,
{
    type Response = RouteOutput;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<RouteOutput, Infallible>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> task::Poll<Result<(), Self::Error>> {
        task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, params: Parameters) -> Self::Future {
        let handler = self.handler.clone();
        Box::pin(async move { Ok(handler.call(params).await) })
    }
}

/// A marker type for handlers that return a [`Result`].
///
/// This type should never be constructed, and importing it is almost certainly
/// a mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputResult {
    _sealed: (),
}

/// A marker type for handlers that return a [`ResponsePayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputResponsePayload {
    _sealed: (),
}

impl<F, Fut, Payload, ErrData> Handler<(OutputResponsePayload,)> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ResponsePayload<Payload, ErrData>> + Send + 'static,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        drop(params);
        Box::pin(async move { self().await.into_raw() })
    }
}

impl<F, Fut, Payload, ErrData> Handler<(OutputResponsePayload, Parameters)> for F
where
    F: FnOnce(Parameters) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ResponsePayload<Payload, ErrData>> + Send + 'static,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move { self(params).await.into_raw() })
    }
}

impl<F, Fut, Input, Payload, ErrData> Handler<(OutputResponsePayload, PhantomParams<Input>)> for F
where
    F: FnOnce(Input) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ResponsePayload<Payload, ErrData>> + Send + 'static,
    Input: RpcRecv,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move {
            let input = deser_or_return!(params);
            drop(params);
            self(input).await.into_raw()
        })
    }
}

impl<F, Fut, Input, Payload, ErrData>
    Handler<(OutputResponsePayload, Parameters, PhantomParams<Input>)> for F
where
    F: FnOnce(Parameters, Input) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = ResponsePayload<Payload, ErrData>> + Send + 'static,
    Input: RpcRecv,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move {
            let input = deser_or_return!(params);
            self(params, input).await.into_raw()
        })
    }
}

impl<F, Fut, Payload, ErrData> Handler<(OutputResult,)> for F
where
    F: FnOnce() -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, ErrorPayload<ErrData>>> + Send + 'static,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        drop(params);
        Box::pin(async move { ResponsePayload(self().await).into_raw() })
    }
}

impl<F, Fut, Payload, ErrData> Handler<(OutputResult, Parameters)> for F
where
    F: FnOnce(Parameters) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, ErrorPayload<ErrData>>> + Send + 'static,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move { ResponsePayload(self(params).await).into_raw() })
    }
}

impl<F, Fut, Input, Payload, ErrData> Handler<(OutputResult, PhantomParams<Input>)> for F
where
    F: FnOnce(Input) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, ErrorPayload<ErrData>>> + Send + 'static,
    Input: RpcRecv,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move {
            let input = deser_or_return!(params);
            drop(params);
            ResponsePayload(self(input).await).into_raw()
        })
    }
}

impl<F, Fut, Input, Payload, ErrData> Handler<(OutputResult, Parameters, PhantomParams<Input>)>
    for F
where
    F: FnOnce(Parameters, Input) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload, ErrorPayload<ErrData>>> + Send + 'static,
    Input: RpcRecv,
    Payload: RpcSend,
    ErrData: RpcSend,
{
    type Future = BoxedOutput;

    fn call(self, params: Parameters) -> Self::Future {
        Box::pin(async move {
            let input = deser_or_return!(params);
            ResponsePayload(self(params, input).await).into_raw()
        })
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
