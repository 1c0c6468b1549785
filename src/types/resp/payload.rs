use crate::{types::codes, RpcSend};
use serde::{Deserialize, Serialize};
use serde_json::value::{to_raw_value, RawValue};
use std::borrow::Cow;
use std::fmt;

const INTERNAL_ERROR: Cow<'_, str> = Cow::Borrowed("Internal error");

/// A JSON-RPC 2.0 response payload.
///
/// This is a thin wrapper around a [`Result`] type containing either
/// the successful payload or an error payload. Exactly one of the two ends up
/// in the response envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct ResponsePayload<Payload, ErrData>(pub Result<Payload, ErrorPayload<ErrData>>);

impl<T, E> From<Result<T, ErrorPayload<E>>> for ResponsePayload<T, E> {
    fn from(res: Result<T, ErrorPayload<E>>) -> Self {
        Self(res)
    }
}

impl<T, E> From<ErrorPayload<E>> for ResponsePayload<T, E> {
    fn from(err: ErrorPayload<E>) -> Self {
        Self(Err(err))
    }
}

impl<Payload, ErrData> ResponsePayload<Payload, ErrData> {
    /// Create a new successful payload.
    pub const fn success(payload: Payload) -> Self {
        Self(Ok(payload))
    }

    /// Create a new error payload for a parse error.
    pub const fn parse_error() -> Self {
        Self(Err(ErrorPayload::parse_error()))
    }

    /// Create a new error payload for an invalid request.
    pub const fn invalid_request() -> Self {
        Self(Err(ErrorPayload::invalid_request()))
    }

    /// Create a new error payload for a method not found error.
    pub const fn method_not_found() -> Self {
        Self(Err(ErrorPayload::method_not_found()))
    }

    /// Create a new error payload for an invalid params error.
    pub const fn invalid_params() -> Self {
        Self(Err(ErrorPayload::invalid_params()))
    }

    /// Create a new error payload for an internal error.
    pub const fn internal_error() -> Self {
        Self(Err(ErrorPayload::internal_error()))
    }

    /// Create a new error payload for an internal error with a custom message.
    pub const fn internal_error_message(message: Cow<'static, str>) -> Self {
        Self(Err(ErrorPayload::internal_error_message(message)))
    }

    /// Create a new error payload with an application-defined code and
    /// message.
    pub const fn error(code: i64, message: Cow<'static, str>) -> Self {
        Self(Err(ErrorPayload::new(code, message)))
    }

    /// Fallible conversion to the successful payload.
    pub const fn as_success(&self) -> Option<&Payload> {
        match self {
            Self(Ok(payload)) => Some(payload),
            _ => None,
        }
    }

    /// Fallible conversion to the error object.
    pub const fn as_error(&self) -> Option<&ErrorPayload<ErrData>> {
        match self {
            Self(Err(payload)) => Some(payload),
            _ => None,
        }
    }

    /// Returns `true` if the response payload is a success.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self(Ok(_)))
    }

    /// Returns `true` if the response payload is an error.
    pub const fn is_error(&self) -> bool {
        matches!(self, Self(Err(_)))
    }
}

/// A JSON-RPC 2.0 error object.
///
/// This response indicates that the server received the request, but that
/// there was an error in the processing of it. Handler-defined codes are
/// passed to the client untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload<ErrData = Box<RawValue>> {
    /// The error code.
    pub code: i64,
    /// The error message (if any).
    pub message: Cow<'static, str>,
    /// The error data (if any).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ErrData>,
}

impl<E> ErrorPayload<E> {
    /// Create a new error payload with an arbitrary code and message, and no
    /// data.
    pub const fn new(code: i64, message: Cow<'static, str>) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    /// Create a new error payload for a parse error.
    pub const fn parse_error() -> Self {
        Self::new(codes::PARSE_ERROR, Cow::Borrowed("Parse error"))
    }

    /// Create a new error payload for an invalid request.
    pub const fn invalid_request() -> Self {
        Self::new(codes::INVALID_REQUEST, Cow::Borrowed("Invalid Request"))
    }

    /// Create a new error payload for a method not found error.
    pub const fn method_not_found() -> Self {
        Self::new(codes::METHOD_NOT_FOUND, Cow::Borrowed("Method not found"))
    }

    /// Create a new error payload for an invalid params error.
    pub const fn invalid_params() -> Self {
        Self::new(codes::INVALID_PARAMS, Cow::Borrowed("Invalid params"))
    }

    /// Create a new error payload for an internal error.
    pub const fn internal_error() -> Self {
        Self::new(codes::INTERNAL_ERROR, INTERNAL_ERROR)
    }

    /// Create a new error payload for an internal error with a custom message.
    pub const fn internal_error_message(message: Cow<'static, str>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }

    /// Create a new error payload for an id that is not a string, an integer
    /// or null.
    pub const fn invalid_id() -> Self {
        Self::new(codes::INVALID_ID, Cow::Borrowed("Invalid ID"))
    }

    /// Create a new error payload for a `method` member that is not a string.
    pub const fn invalid_method() -> Self {
        Self::new(codes::INVALID_METHOD, Cow::Borrowed("Invalid method"))
    }

    /// Create a new error payload for unsupported protocol features.
    pub const fn not_implemented() -> Self {
        Self::new(codes::NOT_IMPLEMENTED, Cow::Borrowed("Not implemented"))
    }

    /// Attach data to this error, replacing any existing data.
    pub fn with_data(self, data: E) -> Self {
        Self {
            data: Some(data),
            ..self
        }
    }
}

impl ErrorPayload {
    /// Attach a human-readable detail string as the error data.
    pub fn with_detail(self, detail: impl fmt::Display) -> Self {
        let data = to_raw_value(&detail.to_string()).ok();
        Self { data, ..self }
    }

    /// The error data as a string, if it is a JSON string.
    pub fn detail(&self) -> Option<String> {
        self.data
            .as_deref()
            .and_then(|data| serde_json::from_str(data.get()).ok())
    }
}

impl<E> ErrorPayload<E>
where
    E: RpcSend,
{
    /// Consume this error payload, serializing the data field into a
    /// [`RawValue`].
    pub fn into_raw(self) -> serde_json::Result<ErrorPayload> {
        Ok(ErrorPayload {
            code: self.code,
            message: self.message,
            data: self.data.map(|d| d.into_raw_value()).transpose()?,
        })
    }
}

impl<T, E> ResponsePayload<T, E>
where
    T: RpcSend,
    E: RpcSend,
{
    /// Consume this response payload, serializing the result and error data
    /// into [`RawValue`]s.
    pub fn into_raw(self) -> serde_json::Result<ResponsePayload<Box<RawValue>, Box<RawValue>>> {
        match self.0 {
            Ok(payload) => Ok(ResponsePayload(Ok(payload.into_raw_value()?))),
            Err(err) => Ok(ResponsePayload(Err(err.into_raw()?))),
        }
    }
}

impl<ErrData: fmt::Display> fmt::Display for ErrorPayload<ErrData> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error code {}: {}{}",
            self.code,
            self.message,
            self.data
                .as_ref()
                .map(|data| format!(", data: {}", data))
                .unwrap_or_default()
        )
    }
}

impl<ErrData: fmt::Debug + fmt::Display> std::error::Error for ErrorPayload<ErrData> {}


// Some code is this file is reproduced under the terms of the MIT license. It
// originates from the `alloy` crate. The original source code can be found at
// the following URL, and the original license is included below.
//
// https://github.com/alloy-rs/alloy
//
// The MIT License (MIT)
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
