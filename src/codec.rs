//! Newline-delimited JSON encoding of [`Envelope`]s.
//!
//! Pure transforms only. Accumulating bytes until a delimiter shows up is the
//! frame reader's job (see `transport::tcp`).

use core::fmt;

use serde_json::Value;

use crate::protocol::{Envelope, KNOWN_TYPES};

pub const DELIMITER: u8 = b'\n';

/// Why a line could not be turned into an [`Envelope`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Blank line.
    Empty,
    /// Not a JSON object.
    Malformed(String),
    /// JSON object without a string `type` field.
    MissingType,
    /// `type` is not one of [`KNOWN_TYPES`].
    UnknownType(String),
    /// Known `type` with fields that do not fit it.
    InvalidPayload { tag: String, reason: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Empty => write!(f, "Empty message"),
            DecodeError::Malformed(reason) => write!(f, "Malformed message: {}", reason),
            DecodeError::MissingType => write!(f, "Message has no 'type' field"),
            DecodeError::UnknownType(tag) => write!(f, "Unknown message type '{}'", tag),
            DecodeError::InvalidPayload { tag, reason } => {
                write!(f, "Invalid '{}' message: {}", tag, reason)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// Serialize `envelope` as one line, terminated by a single `\n`.
pub fn encode(envelope: &Envelope) -> serde_json::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(envelope)?;
    bytes.push(DELIMITER);
    Ok(bytes)
}

/// Parse one complete line. A trailing `\n` or `\r\n` is ignored.
pub fn decode(line: &[u8]) -> Result<Envelope, DecodeError> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }

    let value: Value =
        serde_json::from_slice(line).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::Malformed("expected a JSON object".to_string()));
    }
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(DecodeError::MissingType)?
        .to_string();
    if !KNOWN_TYPES.contains(&tag.as_str()) {
        return Err(DecodeError::UnknownType(tag));
    }
    serde_json::from_value(value).map_err(|e| DecodeError::InvalidPayload {
        tag,
        reason: e.to_string(),
    })
}
