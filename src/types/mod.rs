//! Wire types: the request envelope, response payloads and the error
//! catalogue.

pub mod codes;

mod id;
pub use id::normalize_id;

mod req;
pub(crate) use req::{Decoded, Request};

mod resp;
pub(crate) use resp::Response;
pub use resp::{ErrorPayload, ResponsePayload};
