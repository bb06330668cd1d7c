// crates/batch-ledger-core/src/codec.rs
// ============================================================================
// Module: Batch Ledger Blob Codec
// Description: Explicit encode/decode contracts for opaque ledger payloads.
// Purpose: Store restart tokens, user data, and status records as framed bytes.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every blob column holds a versioned frame:
//!
//! | bytes | field                                  |
//! |-------|----------------------------------------|
//! | 4     | magic `BLGR`                           |
//! | 1     | frame version (`1`)                    |
//! | 1     | presence flag (`0` null, `1` present)  |
//! | 4     | payload length, big endian             |
//! | n     | payload                                |
//!
//! The frame is what lets a stored null token differ from a missing row, and
//! it is what turns truncation or corruption into a hard [`CodecError`] rather
//! than a partial value. Payload bytes are produced by a caller-chosen
//! [`BlobCodec`]; the ledger never inspects them. There is no generic object
//! deserialization anywhere in this path.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Frame magic bytes.
pub const FRAME_MAGIC: [u8; 4] = *b"BLGR";
/// Current frame version.
pub const FRAME_VERSION: u8 = 1;
/// Frame header length in bytes.
pub const FRAME_HEADER_LEN: usize = 10;
/// Largest payload a frame can describe.
pub const MAX_FRAME_PAYLOAD: usize = u32::MAX as usize;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Blob encoding and decoding errors.
///
/// # Invariants
/// - Messages never embed payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the declared length.
    #[error("blob truncated: expected {expected} bytes, found {actual}")]
    Truncated {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },
    /// Frame magic does not match.
    #[error("blob frame magic mismatch")]
    BadMagic,
    /// Frame version is not understood.
    #[error("unsupported blob frame version: {0}")]
    UnsupportedVersion(u8),
    /// Input continues past the declared length.
    #[error("blob has {0} trailing bytes")]
    TrailingBytes(usize),
    /// Payload could not be encoded or decoded.
    #[error("blob payload error: {0}")]
    Payload(String),
}

// ============================================================================
// SECTION: Codec Contract
// ============================================================================

/// Caller-supplied encode/decode pair for one payload type.
///
/// # Invariants
/// - `decode(encode(v)) == v` for every value the caller can produce.
/// - `decode` rejects malformed input instead of returning a partial value.
pub trait BlobCodec {
    /// Value type carried by the blob.
    type Value;

    /// Encodes a value into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the value cannot be encoded.
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    /// Decodes bytes into a value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the bytes are truncated or corrupt.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError>;
}

// ============================================================================
// SECTION: Codecs
// ============================================================================

/// Identity codec for callers that already hold bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytesCodec;

impl BlobCodec for RawBytesCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        Ok(bytes.to_vec())
    }
}

/// JSON codec for serde types with an explicit schema.
#[derive(Debug)]
pub struct JsonCodec<T> {
    /// Payload type marker.
    marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    /// Creates a JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for JsonCodec<T> {}

impl<T: Serialize + DeserializeOwned> BlobCodec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|err| CodecError::Payload(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        serde_json::from_slice(bytes).map_err(|err| CodecError::Payload(err.to_string()))
    }
}

/// Frame codec mapping an optional payload to framed bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl BlobCodec for FrameCodec {
    type Value = Option<Vec<u8>>;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError> {
        encode_frame(value.as_deref())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Self::Value, CodecError> {
        decode_frame(bytes)
    }
}

// ============================================================================
// SECTION: Frame Helpers
// ============================================================================

/// Wraps an optional payload in a frame.
///
/// # Errors
///
/// Returns [`CodecError::Payload`] when the payload exceeds [`MAX_FRAME_PAYLOAD`].
pub fn encode_frame(payload: Option<&[u8]>) -> Result<Vec<u8>, CodecError> {
    let body = payload.unwrap_or_default();
    let length = u32::try_from(body.len())
        .map_err(|_| CodecError::Payload(format!("payload exceeds {MAX_FRAME_PAYLOAD} bytes")))?;
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.push(FRAME_VERSION);
    frame.push(u8::from(payload.is_some()));
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// Unwraps a frame produced by [`encode_frame`].
///
/// # Errors
///
/// Returns [`CodecError`] for short input, unknown magic or version, an
/// invalid presence flag, or a length that disagrees with the input.
pub fn decode_frame(bytes: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
    let Some((header, body)) = bytes.split_first_chunk::<FRAME_HEADER_LEN>() else {
        return Err(CodecError::Truncated {
            expected: FRAME_HEADER_LEN,
            actual: bytes.len(),
        });
    };
    if header[.. 4] != FRAME_MAGIC {
        return Err(CodecError::BadMagic);
    }
    if header[4] != FRAME_VERSION {
        return Err(CodecError::UnsupportedVersion(header[4]));
    }
    let present = match header[5] {
        0 => false,
        1 => true,
        other => return Err(CodecError::Payload(format!("invalid presence flag: {other}"))),
    };
    let length = u32::from_be_bytes([header[6], header[7], header[8], header[9]]);
    let length = usize::try_from(length)
        .map_err(|_| CodecError::Payload("frame length exceeds platform limits".to_string()))?;
    if body.len() < length {
        return Err(CodecError::Truncated {
            expected: FRAME_HEADER_LEN + length,
            actual: bytes.len(),
        });
    }
    if body.len() > length {
        return Err(CodecError::TrailingBytes(body.len() - length));
    }
    if !present {
        if length != 0 {
            return Err(CodecError::Payload("null frame carries a payload".to_string()));
        }
        return Ok(None);
    }
    Ok(Some(body.to_vec()))
}

/// Frames a value encoded by `codec`.
///
/// # Errors
///
/// Returns [`CodecError`] when encoding fails.
pub fn encode_value<C: BlobCodec>(codec: &C, value: &C::Value) -> Result<Vec<u8>, CodecError> {
    let payload = codec.encode(value)?;
    encode_frame(Some(&payload))
}

/// Decodes a framed value with `codec`; a null frame is an error.
///
/// # Errors
///
/// Returns [`CodecError`] when the frame or payload is malformed.
pub fn decode_value<C: BlobCodec>(codec: &C, bytes: &[u8]) -> Result<C::Value, CodecError> {
    let payload =
        decode_frame(bytes)?.ok_or_else(|| CodecError::Payload("unexpected null frame".to_string()))?;
    codec.decode(&payload)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
