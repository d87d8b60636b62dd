//! JSON codec for the command server envelopes
//!
//! Inbound:
//! ```text
//! command   {"action": "open", "drawer": 1, "code": "X1"}
//! auth      {"token": "..."}
//! ```
//! Outbound:
//! ```text
//! auth      {"device_id": "...", "secret": "..."}
//! failure   {"errorMessage": "..."}
//! ```
//!
//! Command parsing is lenient on `action` and `drawer` so that a command with
//! a usable tracking code always reaches validation and gets an explicit
//! outcome. Only the code itself is mandatory.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{endpoints, Action, Command};

/// Maximum accepted body size (64 KB). Commands are tiny.
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Body too large: {0} bytes (max: {MAX_BODY_SIZE})")]
    BodyTooLarge(usize),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object")]
    NotAnObject,

    #[error("Missing or empty command code")]
    MissingCode,

    #[error("Command code cannot be addressed in a URL: {0:?}")]
    UnaddressableCode(String),

    #[error("Missing or empty token")]
    MissingToken,
}

#[derive(Serialize)]
struct AuthRequest<'a> {
    device_id: &'a str,
    secret: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct FailureReport {
    #[serde(rename = "errorMessage")]
    error_message: String,
}

fn check_size(raw: &[u8]) -> Result<(), CodecError> {
    if raw.len() > MAX_BODY_SIZE {
        return Err(CodecError::BodyTooLarge(raw.len()));
    }
    Ok(())
}

/// Parse a command body
///
/// Fails when the body is not a JSON object or when `code` is missing, empty
/// or not a string. A non-integer `drawer` is treated as absent and a
/// non-string `action` as missing, both of which validation reports back.
pub fn parse_command(raw: &[u8]) -> Result<Command, CodecError> {
    check_size(raw)?;

    let value: Value = serde_json::from_slice(raw)?;
    let obj = value.as_object().ok_or(CodecError::NotAnObject)?;

    let code = match obj.get("code").and_then(Value::as_str) {
        Some(code) if !code.trim().is_empty() => code.to_string(),
        _ => return Err(CodecError::MissingCode),
    };
    if !endpoints::is_addressable(&code) {
        return Err(CodecError::UnaddressableCode(code));
    }

    let action = obj
        .get("action")
        .and_then(Value::as_str)
        .map(Action::from_wire);

    let drawer = obj.get("drawer").and_then(Value::as_i64);

    Ok(Command {
        code,
        action,
        drawer,
    })
}

/// Encode the device credential request
pub fn encode_auth_request(device_id: &str, secret: &str) -> Result<Bytes, CodecError> {
    let body = serde_json::to_vec(&AuthRequest { device_id, secret })?;
    Ok(Bytes::from(body))
}

/// Extract the bearer token from an authentication response
///
/// A response without a non-empty string `token` is rejected as a whole.
pub fn decode_auth_response(raw: &[u8]) -> Result<String, CodecError> {
    check_size(raw)?;

    let response: AuthResponse = serde_json::from_slice(raw)?;
    match response.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(CodecError::MissingToken),
    }
}

/// Encode the body of a failure report
pub fn encode_failure(message: &str) -> Result<Bytes, CodecError> {
    let body = serde_json::to_vec(&FailureReport {
        error_message: message.to_string(),
    })?;
    Ok(Bytes::from(body))
}

/// Decode a failure report body (server side of [`encode_failure`])
pub fn decode_failure(raw: &[u8]) -> Result<String, CodecError> {
    check_size(raw)?;
    let report: FailureReport = serde_json::from_slice(raw)?;
    Ok(report.error_message)
}
