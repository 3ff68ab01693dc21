//! Wire format encoding and decoding.
//!
//! Every message travels as a single frame:
//! ```text
//! ┌──────────────────┬───────────────────────────┐
//! │ Length           │ Payload                   │
//! │ 4 bytes          │ `Length` bytes            │
//! │ uint32 LE        │ serialized Request/Response│
//! └──────────────────┴───────────────────────────┘
//! ```
//!
//! There is no magic number, version byte or checksum. The payload is whatever
//! the configured [`MessageSerializer`](crate::codec::MessageSerializer) produced.

use crate::error::{IpcError, Result};

/// Header size in bytes (fixed, exactly 4).
pub const HEADER_SIZE: usize = 4;

/// Default maximum payload size (64 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 64 * 1024 * 1024;

/// Absolute maximum payload size (~2 GB, max i32).
pub const ABSOLUTE_MAX_MESSAGE_SIZE: u32 = i32::MAX as u32;

/// Size of a single payload read.
pub const READ_CHUNK_SIZE: usize = 65_536;

/// Encode a payload length as a little-endian header.
///
/// # Example
///
/// ```
/// use wirecall::protocol::encode_header;
///
/// assert_eq!(encode_header(0x0102_0304), [0x04, 0x03, 0x02, 0x01]);
/// ```
#[inline]
pub fn encode_header(length: u32) -> [u8; HEADER_SIZE] {
    length.to_le_bytes()
}

/// Decode a payload length from a little-endian header.
///
/// Returns `None` if buffer is too short.
#[inline]
pub fn decode_header(buf: &[u8]) -> Option<u32> {
    let bytes: [u8; HEADER_SIZE] = buf.get(..HEADER_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

/// Check a declared payload length against the configured maximum.
///
/// The effective maximum is clamped to [`ABSOLUTE_MAX_MESSAGE_SIZE`].
pub fn validate_length(length: u32, max_message_size: u32) -> Result<()> {
    let max = max_message_size.min(ABSOLUTE_MAX_MESSAGE_SIZE);
    if length > max {
        return Err(IpcError::FrameTooLarge { length, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_little_endian_byte_order() {
        assert_eq!(encode_header(1), [1, 0, 0, 0]);
        assert_eq!(encode_header(256), [0, 1, 0, 0]);
        assert_eq!(decode_header(&[0x00, 0x00, 0x01, 0x00]), Some(65_536));
    }

    #[test]
    fn test_header_size_is_exactly_4() {
        assert_eq!(HEADER_SIZE, 4);
        assert_eq!(encode_header(u32::MAX).len(), HEADER_SIZE);
    }

    #[test]
    fn test_decode_too_short_buffer() {
        assert_eq!(decode_header(&[1, 2, 3]), None);
        assert_eq!(decode_header(&[]), None);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode_header(&[5, 0, 0, 0, 0xFF, 0xFF]), Some(5));
    }

    #[test]
    fn test_validate_length() {
        assert!(validate_length(0, 0).is_ok());
        assert!(validate_length(100, 100).is_ok());
        assert!(matches!(
            validate_length(101, 100),
            Err(IpcError::FrameTooLarge { length: 101, max: 100 })
        ));
    }

    #[test]
    fn test_validate_length_clamps_to_absolute_max() {
        let err = validate_length(u32::MAX, u32::MAX).unwrap_err();
        assert!(matches!(
            err,
            IpcError::FrameTooLarge { max, .. } if max == ABSOLUTE_MAX_MESSAGE_SIZE
        ));
    }
}
