//! Mapping from transport failures to one user-presentable sentence.
//!
//! # Design
//! `classify` is a pure function of the failure, the operation's fallback
//! text, and an optional context label naming the attempted action. Server
//! explanations are preferred where the status allows them (400 and
//! unrecognised codes); auth, not-found, server and network failures always
//! map to fixed advisories regardless of the body.

use serde_json::{Map, Value};

use crate::error::ApiError;

pub const NETWORK_UNREACHABLE: &str =
    "Network error: unable to reach the QR service. Check your connection or API URL.";
pub const AUTHORIZATION_FAILED: &str =
    "Authorization failed. Please sign in or verify access to the QR service.";
pub const ENDPOINT_NOT_FOUND: &str =
    "QR API endpoint not found. Verify QR_API_URL or the backend route.";
pub const SERVER_ERROR: &str =
    "Server error while processing the request. Please try again later.";

/// Produce the message the store records in its `error` field.
pub fn classify(error: &ApiError, fallback: &str, context: Option<&str>) -> String {
    match error {
        ApiError::NoResponse { .. } => NETWORK_UNREACHABLE.to_string(),
        ApiError::InvalidInput(message) => message.clone(),
        ApiError::ClientError { status, body } => match *status {
            400 => extract_api_message(body).unwrap_or_else(|| validation_failed(context)),
            401 | 403 => AUTHORIZATION_FAILED.to_string(),
            404 => ENDPOINT_NOT_FOUND.to_string(),
            _ => extract_api_message(body).unwrap_or_else(|| fallback.to_string()),
        },
        ApiError::ServerError { .. } => SERVER_ERROR.to_string(),
        ApiError::UnexpectedStatus { body, .. } => {
            extract_api_message(body).unwrap_or_else(|| fallback.to_string())
        }
        ApiError::Unclassified(_) => fallback.to_string(),
    }
}

fn validation_failed(context: Option<&str>) -> String {
    match context {
        Some(action) => {
            format!("Validation failed while {action}. Check the destination URL and parameters.")
        }
        None => "Validation failed. Check the destination URL and parameters.".to_string(),
    }
}

/// Pull the most specific server-provided explanation out of a response body.
///
/// Precedence: a plain string body, then the `error`, `message` and `detail`
/// fields, then an `errors` list joined with `"; "`, then an `errors` map
/// flattened to `"field: message"` entries in body order.
pub fn extract_api_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::String(text)) => non_empty(text),
        Ok(Value::Object(fields)) => from_object(&fields),
        Ok(_) => None,
        // Not JSON: the raw text is the message.
        Err(_) => Some(body.to_string()),
    }
}

fn from_object(fields: &Map<String, Value>) -> Option<String> {
    for key in ["error", "message", "detail"] {
        if let Some(text) = fields.get(key).and_then(scalar_text) {
            return Some(text);
        }
    }

    match fields.get("errors") {
        Some(Value::Array(items)) => join(items.iter().filter_map(scalar_text).collect()),
        Some(Value::Object(by_field)) => {
            let entries = by_field
                .iter()
                .flat_map(|(field, value)| match value {
                    Value::Array(messages) => messages
                        .iter()
                        .map(|message| format!("{field}: {}", render(message)))
                        .collect::<Vec<_>>(),
                    other => vec![format!("{field}: {}", render(other))],
                })
                .collect();
            join(entries)
        }
        _ => None,
    }
}

/// Non-empty strings and numbers count as a message; everything else is skipped.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn join(entries: Vec<String>) -> Option<String> {
    non_empty(entries.join("; "))
}
