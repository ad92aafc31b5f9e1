//! Length-prefixed framing for stream transports.
//!
//! Frame format:
//! ```text
//! +--------+--------+--------------------+
//! |  Length (2B BE) |  Payload (Length)  |
//! +--------+--------+--------------------+
//! ```

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::error::ChannelError;

/// Frame header size in bytes
pub const FRAME_HEADER_SIZE: usize = 2;

/// Maximum payload size of one frame
pub const MAX_FRAME_PAYLOAD: usize = 10240;

/// Writes `payload` as one frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ChannelError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(ChannelError::FrameTooLarge(payload.len()));
    }
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.put_u16(payload.len() as u16);
    frame.put_slice(payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame into `buffer` and returns the payload length.
///
/// `buffer` must hold at least [MAX_FRAME_PAYLOAD] bytes.
pub async fn read_frame<R>(reader: &mut R, buffer: &mut [u8]) -> Result<usize, ChannelError>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_SIZE];
    read_exact(reader, &mut header).await?;
    let length = u16::from_be_bytes(header) as usize;
    if length > MAX_FRAME_PAYLOAD || length > buffer.len() {
        return Err(ChannelError::FrameTooLarge(length));
    }
    read_exact(reader, &mut buffer[..length]).await?;
    Ok(length)
}

async fn read_exact<R>(reader: &mut R, buffer: &mut [u8]) -> Result<(), ChannelError>
where
    R: AsyncRead + Unpin,
{
    match reader.read_exact(buffer).await {
        Ok(_) => Ok(()),
        Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(ChannelError::Closed)
        }
        Err(error) => Err(ChannelError::Io(error)),
    }
}
