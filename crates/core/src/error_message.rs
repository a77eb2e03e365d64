use serde_json::Value;

/// Fallback message used when a failure payload carries no readable text.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error occurred";

/// Extracts a human readable message from an arbitrary failure payload.
///
/// Three shapes are recognized:
/// - a structured error object exposing a string `message` field, either at the top level or
///   nested under `error` as record web APIs return it;
/// - a plain string;
/// - anything else, which yields [`UNKNOWN_ERROR_MESSAGE`].
#[must_use]
pub fn extract_error_message(value: &Value) -> String {
    match value {
        Value::String(message) => message.clone(),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| {
                fields
                    .get("error")
                    .and_then(|error| error.get("message"))
                    .and_then(Value::as_str)
            })
            .map(str::to_owned)
            .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_owned()),
        _ => UNKNOWN_ERROR_MESSAGE.to_owned(),
    }
}
