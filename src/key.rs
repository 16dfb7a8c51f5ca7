//! # Key Codec
//!
//! Filters index fixed-width 64-bit integer keys. Engine keys arrive as byte
//! strings whose first 8 bytes hold the integer in little-endian order (the
//! engine's fixed64 encoding); anything past those 8 bytes is ignored.
//!
//! Seek results travel the other way and must compare correctly as raw bytes,
//! so successors are emitted big-endian.
//!
//! ```text
//! key bytes:  [b0 b1 b2 b3 b4 b5 b6 b7 | ignored...]   little-endian u64
//! successor:  [msb ............... lsb]                 big-endian u64
//! ```

use crate::error::{Error, Result};

/// Number of bytes of a key interpreted by the filters.
pub const KEY_SIZE: usize = 8;

/// Width of a decoded key in bits.
pub const KEY_BITS: usize = KEY_SIZE * 8;

/// Decodes the first 8 bytes of `key` as a little-endian `u64`.
///
/// # Errors
///
/// Returns `InvalidArgument` if `key` is shorter than [`KEY_SIZE`].
pub fn decode_key(key: &[u8]) -> Result<u64> {
    match key.get(..KEY_SIZE) {
        Some(head) => {
            let mut buf = [0u8; KEY_SIZE];
            buf.copy_from_slice(head);
            Ok(u64::from_le_bytes(buf))
        }
        None => Err(Error::invalid_argument(format!(
            "Filter keys must be at least {} bytes, got {}",
            KEY_SIZE, key.len()
        ))),
    }
}

/// Encodes `key` the way [`decode_key`] expects to read it.
pub fn encode_key(key: u64) -> [u8; KEY_SIZE] {
    key.to_le_bytes()
}

/// Encodes a successor returned by a filter so that byte order matches
/// numeric order.
pub fn encode_successor(value: u64) -> [u8; KEY_SIZE] {
    value.to_be_bytes()
}

/// Inverse of [`encode_successor`].
pub fn decode_successor(bytes: [u8; KEY_SIZE]) -> u64 {
    u64::from_be_bytes(bytes)
}
