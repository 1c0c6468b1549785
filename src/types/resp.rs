mod payload;
pub use payload::{ErrorPayload, ResponsePayload};

mod ser;
pub(crate) use ser::Response;
