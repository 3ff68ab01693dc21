//! Frame reader and writer.
//!
//! A frame is read in two phases: the fixed header, then the payload in
//! chunks of at most [`READ_CHUNK_SIZE`] bytes. A stream that ends before the
//! frame is complete is a communication failure, never a serialization one.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire_format::{
    decode_header, encode_header, validate_length, HEADER_SIZE, READ_CHUNK_SIZE,
};
use crate::error::{IpcError, Result};

/// Write one frame: the length header, then the payload.
///
/// The two parts go out as separate writes on the same stream, followed by a
/// flush. The frame is sent only once both writes have completed.
pub async fn write_message<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let length = u32::try_from(payload.len()).map_err(|_| IpcError::FrameTooLarge {
        length: u32::MAX,
        max: super::ABSOLUTE_MAX_MESSAGE_SIZE,
    })?;
    validate_length(length, super::ABSOLUTE_MAX_MESSAGE_SIZE)?;

    writer.write_all(&encode_header(length)).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one frame and return its payload.
///
/// # Errors
///
/// - [`IpcError::Communication`] if the stream ends inside the header or payload.
/// - [`IpcError::FrameTooLarge`] if the declared length exceeds `max_message_size`.
/// - [`IpcError::Io`] for any other transport failure.
pub async fn read_message<R>(reader: &mut R, max_message_size: u32) -> Result<Bytes>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return Err(IpcError::Communication(format!(
                "stream closed after {} of {} header bytes",
                filled, HEADER_SIZE
            )));
        }
        filled += n;
    }

    let length = decode_header(&header)
        .ok_or_else(|| IpcError::Communication("incomplete frame header".into()))?;
    validate_length(length, max_message_size)?;

    let length = length as usize;
    let mut payload = BytesMut::zeroed(length);
    let mut received = 0;
    while received < length {
        let end = length.min(received + READ_CHUNK_SIZE);
        let n = reader.read(&mut payload[received..end]).await?;
        if n == 0 {
            return Err(IpcError::Communication(format!(
                "stream closed after {} of {} payload bytes",
                received, length
            )));
        }
        received += n;
    }

    Ok(payload.freeze())
}
