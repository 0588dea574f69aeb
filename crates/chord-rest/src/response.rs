//! Response interpretation
//!
//! Turns a status code, `Retry-After` header and body into a JSON value or a
//! [`ClientError`].

use chord_common::{ClientError, ClientResult};
use serde_json::Value;

/// Interpret a completed HTTP exchange
///
/// Success bodies are parsed as JSON (`Null` when empty, e.g. 204). Errors
/// carry the API's `message` field when present and, for 429, the retry delay
/// from the body's `retry_after` (seconds) or the `Retry-After` header.
pub fn interpret_response(status: u16, retry_after_header: Option<&str>, body: &str) -> ClientResult<Value> {
    if (200..300).contains(&status) {
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        return serde_json::from_str(body).map_err(ClientError::from);
    }

    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map_or_else(|| body.trim().to_string(), str::to_string);

    let retry_after = parsed
        .as_ref()
        .and_then(|v| v.get("retry_after"))
        .and_then(Value::as_f64)
        .or_else(|| retry_after_header.and_then(|h| h.trim().parse::<f64>().ok()));

    Err(ClientError::from_status(status, message, retry_after))
}
