//! JSON encoding of command envelopes and decoding of responses

use serde::de::IgnoredAny;

use crate::error::ProtocolError;
use crate::message::{CommandEnvelope, Response};

/// Whether `byte` may surround a payload without being part of it.
///
/// Kernels that answer from a fixed-size buffer pad the response with NUL
/// bytes; JSON itself allows whitespace between values.
pub(crate) fn is_padding(byte: u8) -> bool {
    byte == 0 || byte.is_ascii_whitespace()
}

/// Serialize a command envelope to its wire form
pub fn encode_command(envelope: &CommandEnvelope) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(envelope).map_err(ProtocolError::Encoding)
}

/// Parse a response payload.
///
/// The payload may be followed by padding (NUL bytes or whitespace) up to the
/// end of the buffer. Anything else after the first JSON value is rejected.
pub fn decode_response(bytes: &[u8]) -> Result<Response, ProtocolError> {
    let start = bytes
        .iter()
        .position(|b| !is_padding(*b))
        .ok_or(ProtocolError::EmptyPayload)?;

    let mut values = serde_json::Deserializer::from_slice(&bytes[start..]).into_iter::<Response>();
    let response = match values.next() {
        Some(Ok(response)) => response,
        Some(Err(e)) => return Err(ProtocolError::Decoding(e)),
        None => return Err(ProtocolError::EmptyPayload),
    };

    let end = start + values.byte_offset();
    if let Some(pos) = bytes[end..].iter().position(|b| !is_padding(*b)) {
        return Err(ProtocolError::TrailingData { offset: end + pos });
    }

    Ok(response)
}

/// Length of the first complete JSON value in `bytes`.
///
/// Returns `Ok(None)` when the value is still incomplete. `bytes` must not
/// start with padding.
pub(crate) fn complete_value_len(bytes: &[u8]) -> Result<Option<usize>, ProtocolError> {
    let mut values = serde_json::Deserializer::from_slice(bytes).into_iter::<IgnoredAny>();

    match values.next() {
        Some(Ok(_)) => Ok(Some(values.byte_offset())),
        Some(Err(e)) if e.is_eof() => Ok(None),
        Some(Err(e)) => Err(ProtocolError::Decoding(e)),
        None => Ok(None),
    }
}
