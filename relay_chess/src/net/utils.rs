use serde::{Serialize, de::DeserializeOwned};

use super::errors::{CodecError, Result};

/// Maximum allowed frame size (64KB). Real frames are a few hundred bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Serialize `value` into a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails or the frame is too large.
pub fn encode<T: Serialize>(value: &T) -> Result<String> {
    let frame = serde_json::to_string(value).map_err(CodecError::Encode)?;
    if frame.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            actual: frame.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(frame)
}

/// Parse a JSON text frame.
///
/// # Errors
///
/// Returns an error if the frame is too large or isn't a valid `T`.
pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T> {
    if frame.len() > MAX_MESSAGE_SIZE {
        return Err(CodecError::MessageTooLarge {
            actual: frame.len(),
            max: MAX_MESSAGE_SIZE,
        });
    }
    serde_json::from_str(frame).map_err(CodecError::Decode)
}
