//! Outbound carrier integration.
//!
//! [`thingspace`] talks to the Verizon ThingSpace REST APIs. This module
//! holds what every operation shares: the error taxonomy and the bounded
//! extraction of token fields from carrier response documents.

pub mod thingspace;

pub use thingspace::{CarrierAccount, ThingSpaceClient};

use thiserror::Error;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Base64-encoded NIDD payloads beyond this length are rejected locally,
/// before any network traffic.
pub const MAX_ENCODED_MESSAGE_LEN: usize = 10_864;

/// Token documents are tiny; anything bigger than this is not one.
const MAX_TOKEN_DOCUMENT_LEN: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failures talking to the carrier. No operation retries; every variant
/// surfaces to the caller as-is.
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("carrier request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("could not encode request body: {0}")]
    Encode(String),
    #[error("carrier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("carrier rejected the call: {code}: {message}")]
    Remote { code: String, message: String },
    #[error("malformed carrier response: {0}")]
    Malformed(String),
    #[error("encoded NIDD payload is {encoded_len} bytes, the ceiling is {MAX_ENCODED_MESSAGE_LEN}")]
    MessageTooLarge { encoded_len: usize },
}

// ---------------------------------------------------------------------------
// Response field extraction
// ---------------------------------------------------------------------------

/// Pull a named top-level string field out of a carrier response document.
///
/// The carrier reports failures in-band: a 200 whose body carries `error` or
/// `errorCode` is still a failed call. Those become [`CarrierError::Remote`]
/// with the sibling description attached when present. The token value itself
/// stays opaque; it is returned as-is and never interpreted.
pub(crate) fn extract_field(body: &str, field: &str) -> Result<String, CarrierError> {
    if body.len() > MAX_TOKEN_DOCUMENT_LEN {
        return Err(CarrierError::Malformed(format!(
            "document is {} bytes, expected a small token object",
            body.len()
        )));
    }

    let document: serde_json::Value =
        serde_json::from_str(body).map_err(|e| CarrierError::Malformed(e.to_string()))?;
    let Some(object) = document.as_object() else {
        return Err(CarrierError::Malformed(
            "top level is not an object".to_string(),
        ));
    };

    for (code_key, description_key) in
        [("error", "error_description"), ("errorCode", "errorMessage")]
    {
        if let Some(code_value) = object.get(code_key) {
            let code = match code_value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let message = object
                .get(description_key)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            return Err(CarrierError::Remote { code, message });
        }
    }

    match object.get(field) {
        Some(serde_json::Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(CarrierError::Malformed(format!(
            "field {field} is not a string"
        ))),
        None => Err(CarrierError::Malformed(format!("field {field} is missing"))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
