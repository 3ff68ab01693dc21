//! Protocol module - wire format and framed message I/O.
//!
//! This module implements the framing shared by both ends of an exchange:
//! - 4-byte little-endian length header
//! - Frame reader/writer over any `AsyncRead`/`AsyncWrite`
//! - [`MessageChannel`], which pairs a stream with a serializer and moves
//!   whole [`Request`](crate::message::Request)/[`Response`](crate::message::Response) values

mod channel;
mod frame;
mod wire_format;

pub use channel::MessageChannel;
pub use frame::{read_message, write_message};
pub use wire_format::{
    decode_header, encode_header, validate_length, ABSOLUTE_MAX_MESSAGE_SIZE,
    DEFAULT_MAX_MESSAGE_SIZE, HEADER_SIZE, READ_CHUNK_SIZE,
};
