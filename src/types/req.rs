use serde::{Deserialize, Deserializer};
use serde_json::value::RawValue;
use tracing::{debug, enabled, instrument, span::Span, Level};

/// A decoded JSON-RPC request envelope.
///
/// Members are kept as raw JSON until the pipeline needs them. `id` is
/// `None` when the member is absent or `null`.
#[derive(Debug, Clone, Default)]
pub(crate) struct Request {
    /// The `jsonrpc` member. Empty when absent or `null`.
    pub(crate) jsonrpc: String,
    /// The `method` member. Empty when absent or `null`.
    pub(crate) method: String,
    /// The raw `params` member.
    pub(crate) params: Option<Box<RawValue>>,
    /// The raw `id` member. Never a literal `null`.
    pub(crate) id: Option<Box<RawValue>>,
}

/// Outcome of decoding a request body.
#[derive(Debug)]
pub(crate) enum Decoded {
    /// A single request object.
    Ok(Request),
    /// A well-formed top-level array, i.e. a batch.
    Batch,
    /// A member had the wrong JSON type.
    FieldType(&'static str),
    /// The body is not a JSON request object.
    Malformed(serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "present")]
    jsonrpc: Option<Box<RawValue>>,
    #[serde(default, deserialize_with = "present")]
    method: Option<Box<RawValue>>,
    #[serde(default, deserialize_with = "present")]
    params: Option<Box<RawValue>>,
    #[serde(default, deserialize_with = "present")]
    id: Option<Box<RawValue>>,
}

/// Deserialize a member that is present in the object, including `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

/// Decode an optional string member. `null` decodes to the empty string.
fn string_member(raw: Option<&RawValue>) -> serde_json::Result<String> {
    match raw {
        Some(raw) => serde_json::from_str::<Option<String>>(raw.get()).map(Option::unwrap_or_default),
        None => Ok(String::new()),
    }
}

impl Request {
    /// Decode a request body.
    #[instrument(level = "debug", skip(body), fields(buf_len = body.len(), body = tracing::field::Empty))]
    pub(crate) fn decode(body: &[u8]) -> Decoded {
        if enabled!(Level::TRACE) {
            Span::current().record("body", String::from_utf8_lossy(body).as_ref());
        }

        let raw = match serde_json::from_slice::<&RawValue>(body) {
            Ok(raw) => raw,
            Err(err) => return Decoded::Malformed(err),
        };

        if raw.get().starts_with('[') {
            debug!("batch request rejected");
            return Decoded::Batch;
        }

        let envelope: Envelope = match serde_json::from_str(raw.get()) {
            Ok(envelope) => envelope,
            Err(err) => return Decoded::Malformed(err),
        };

        let Ok(method) = string_member(envelope.method.as_deref()) else {
            return Decoded::FieldType("method");
        };

        let jsonrpc = match string_member(envelope.jsonrpc.as_deref()) {
            Ok(jsonrpc) => jsonrpc,
            Err(err) => return Decoded::Malformed(err),
        };

        Decoded::Ok(Self {
            jsonrpc,
            method,
            params: envelope.params,
            id: envelope.id.filter(|id| id.get() != "null"),
        })
    }

    /// True if the request has no `id`, or a `null` one.
    pub(crate) const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}
