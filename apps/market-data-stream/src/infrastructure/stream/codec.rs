//! Stream Codec Module
//!
//! JSON encoding and decoding for the market data gateway.
//!
//! The gateway sends one JSON object per text frame. Anything that does not
//! parse, or parses to something other than an object, is rejected here and
//! never reaches listeners.

use serde_json::Value;

use super::messages::ClientMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload parsed but is not a JSON object.
    #[error("expected JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// JSON codec for the market data gateway.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into a JSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or is not an object.
    pub fn decode(&self, text: &str) -> Result<Value, CodecError> {
        let value: Value = serde_json::from_str(text.trim())?;

        if value.is_object() {
            Ok(value)
        } else {
            Err(CodecError::NotAnObject(json_kind(&value)))
        }
    }

    /// Encode a client message.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, message: &ClientMessage) -> Result<String, CodecError> {
        Ok(serde_json::to_string(message)?)
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
