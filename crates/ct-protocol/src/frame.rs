//! Stream framing for Kernel messages
//!
//! The Kernel protocol was originally spoken as bare JSON values on the TCP
//! stream, with no length information. [`Framing::Raw`] keeps that wire format
//! and finds the end of each payload by scanning for one complete JSON value.
//! [`Framing::LengthPrefixed`] prefixes every payload with its length so the
//! receiver knows the exact size before parsing.
//!
//! Length-prefixed frame format:
//! ```text
//! +----------------+-------------------+
//! | Length (4B BE) | Payload (N bytes) |
//! +----------------+-------------------+
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{complete_value_len, is_padding};
use crate::error::ProtocolError;

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Maximum payload size (64 KiB)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024;

/// How payload boundaries are marked on the stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// Bare JSON values, optionally separated by padding
    #[default]
    Raw,
    /// Big-endian `u32` length followed by the payload
    LengthPrefixed,
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::Raw => write!(f, "raw"),
            Framing::LengthPrefixed => write!(f, "length_prefixed"),
        }
    }
}

impl FromStr for Framing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Framing::Raw),
            "length_prefixed" | "length-prefixed" => Ok(Framing::LengthPrefixed),
            other => Err(format!(
                "unknown framing '{}', expected 'raw' or 'length_prefixed'",
                other
            )),
        }
    }
}

/// Codec that splits the byte stream into payloads and frames outgoing ones
#[derive(Debug, Default)]
pub struct KernelFramer {
    framing: Framing,
    /// Length read from a prefix whose payload has not fully arrived
    pending_length: Option<usize>,
}

impl KernelFramer {
    /// Create a new framer
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            pending_length: None,
        }
    }

    /// The framing in use
    pub fn framing(&self) -> Framing {
        self.framing
    }

    fn decode_raw(&mut self, src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
        skip_padding(src);
        if src.is_empty() {
            return Ok(None);
        }

        match complete_value_len(src)? {
            Some(len) if len > MAX_PAYLOAD_SIZE => Err(ProtocolError::PayloadTooLarge {
                size: len,
                max: MAX_PAYLOAD_SIZE,
            }),
            Some(len) => {
                let payload = src.split_to(len);
                skip_padding(src);
                Ok(Some(payload))
            }
            None if src.len() > MAX_PAYLOAD_SIZE => Err(ProtocolError::PayloadTooLarge {
                size: src.len(),
                max: MAX_PAYLOAD_SIZE,
            }),
            None => Ok(None),
        }
    }

    fn decode_length_prefixed(
        &mut self,
        src: &mut BytesMut,
    ) -> Result<Option<BytesMut>, ProtocolError> {
        let len = match self.pending_length.take() {
            Some(len) => len,
            None => {
                if src.len() < LENGTH_PREFIX_SIZE {
                    return Ok(None);
                }
                let len = src.get_u32() as usize;
                if len > MAX_PAYLOAD_SIZE {
                    return Err(ProtocolError::PayloadTooLarge {
                        size: len,
                        max: MAX_PAYLOAD_SIZE,
                    });
                }
                len
            }
        };

        if src.len() < len {
            self.pending_length = Some(len);
            src.reserve(len - src.len());
            return Ok(None);
        }

        Ok(Some(src.split_to(len)))
    }
}

fn skip_padding(src: &mut BytesMut) {
    let padding = src.iter().take_while(|b| is_padding(**b)).count();
    src.advance(padding);
}

impl Decoder for KernelFramer {
    type Item = BytesMut;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let payload = match self.framing {
            Framing::Raw => self.decode_raw(src)?,
            Framing::LengthPrefixed => self.decode_length_prefixed(src)?,
        };

        if let Some(ref payload) = payload {
            tracing::trace!(len = payload.len(), framing = %self.framing, "Decoded payload");
        }
        Ok(payload)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload) = self.decode(src)? {
            return Ok(Some(payload));
        }

        if self.framing == Framing::Raw {
            skip_padding(src);
        }
        if src.is_empty() && self.pending_length.is_none() {
            Ok(None)
        } else {
            Err(ProtocolError::Truncated {
                buffered: src.len(),
            })
        }
    }
}

impl Encoder<Bytes> for KernelFramer {
    type Error = ProtocolError;

    fn encode(&mut self, payload: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        match self.framing {
            Framing::Raw => dst.reserve(payload.len()),
            Framing::LengthPrefixed => {
                dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
                dst.put_u32(payload.len() as u32);
            }
        }
        dst.extend_from_slice(&payload);

        Ok(())
    }
}
