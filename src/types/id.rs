use crate::ErrorPayload;
use serde_json::{value::RawValue, Value};

/// Normalized form of an absent or `null` id.
pub(crate) const NULL_ID: &str = "null";

const INVALID_ID_DETAIL: &str = "ID must be one of string, number or undefined";

/// Convert a request id into its canonical string form.
///
/// - absent or `null` ids become `"null"`,
/// - strings are returned as-is,
/// - numbers are accepted only when they have no fractional part, and are
///   rendered as base-10 integers,
/// - any other JSON type is rejected with an [`ErrorPayload::invalid_id`].
///
/// The normalized string is for display and logging. Responses always echo
/// the raw id.
pub fn normalize_id(id: Option<&RawValue>) -> Result<String, ErrorPayload> {
    let Some(id) = id else {
        return Ok(NULL_ID.to_owned());
    };

    let value: Value = serde_json::from_str(id.get())
        .map_err(|err| ErrorPayload::invalid_id().with_detail(err))?;

    match value {
        Value::Null => Ok(NULL_ID.to_owned()),
        Value::String(s) => Ok(s),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i.to_string());
            }
            if let Some(u) = n.as_u64() {
                return Ok(u.to_string());
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.trunc() == f => Ok(format!("{f:.0}")),
                _ => Err(ErrorPayload::invalid_id().with_detail(INVALID_ID_DETAIL)),
            }
        }
        _ => Err(ErrorPayload::invalid_id().with_detail(INVALID_ID_DETAIL)),
    }
}
