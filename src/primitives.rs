use serde::{de::DeserializeOwned, Serialize};
use serde_json::value::RawValue;

/// An object that can be sent over RPC, as a handler result or error data.
///
/// This is blanket implemented for all types that implement [`Serialize`].
pub trait RpcSend: Send + Sync + Unpin {
    /// Consume this value and serialize it into a [`RawValue`].
    fn into_raw_value(self) -> serde_json::Result<Box<RawValue>>;
}

impl<T> RpcSend for T
where
    T: Serialize + Send + Sync + Unpin,
{
    fn into_raw_value(self) -> serde_json::Result<Box<RawValue>> {
        serde_json::value::to_raw_value(&self)
    }
}

/// An object that can be received over RPC, as handler params.
///
/// This is blanket implemented for all types that implement
/// [`DeserializeOwned`].
pub trait RpcRecv: DeserializeOwned + Send + Sync + Unpin + 'static {}

impl<T> RpcRecv for T where T: DeserializeOwned + Send + Sync + Unpin + 'static {}
