use crate::{types::codes::JSONRPC_VERSION, ResponsePayload};
use bytes::Bytes;
use serde::{ser::SerializeMap, Serialize, Serializer};
use serde_json::value::RawValue;

/// Hand-built envelope emitted when a response cannot be serialized. It does
/// not pass through the serializer, so it is always well-formed.
const SERIALIZATION_FAILURE: &str = r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error","data":"response serialization error"},"id":null}"#;

/// Response struct.
#[derive(Debug, Clone)]
pub(crate) struct Response<'a, 'b, T, E> {
    pub(crate) id: &'b RawValue,
    pub(crate) payload: &'a ResponsePayload<T, E>,
}

impl Response<'_, '_, (), ()> {
    /// Response failed to serialize.
    pub(crate) const fn serialization_failure() -> Bytes {
        Bytes::from_static(SERIALIZATION_FAILURE.as_bytes())
    }

    /// Build a JSON-RPC response body from an id and a payload.
    ///
    /// A missing id is rendered as `null`. If the envelope cannot be
    /// serialized, the constant [`Self::serialization_failure`] body is
    /// returned instead.
    pub(crate) fn build<T, E>(id: Option<&RawValue>, payload: &ResponsePayload<T, E>) -> Bytes
    where
        T: Serialize,
        E: Serialize,
    {
        Response {
            id: id.unwrap_or(RawValue::NULL),
            payload,
        }
        .to_json()
    }
}

impl<T, E> Response<'_, '_, T, E>
where
    T: Serialize,
    E: Serialize,
{
    fn to_json(&self) -> Bytes {
        match serde_json::to_vec(self) {
            Ok(body) => body.into(),
            Err(err) => {
                tracing::debug!(%err, id = %self.id, "failed to serialize response");
                Response::serialization_failure()
            }
        }
    }
}

impl<T, E> Serialize for Response<'_, '_, T, E>
where
    T: Serialize,
    E: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("jsonrpc", JSONRPC_VERSION)?;
        match &self.payload {
            ResponsePayload(Ok(result)) => {
                map.serialize_entry("result", result)?;
            }
            ResponsePayload(Err(error)) => {
                map.serialize_entry("error", error)?;
            }
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}


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
