//! Length-prefixed framing.
//!
//! Every envelope travels over the stream as a frame: a 2-byte little-endian length
//! followed by exactly that many payload bytes. The codec knows nothing about the
//! payload itself; it only delimits it.
//!
//! ```text
//! +----------------+---------------------------+
//! | length: u16 LE | payload: `length` bytes   |
//! +----------------+---------------------------+
//! ```
//!
//! Payloads larger than [`MAX_PAYLOAD_SIZE`] cannot be described by the length field and
//! are rejected by [`encode_frame`] before anything is written. [`read_frame`] does no size
//! validation of its own beyond what the 2-byte field can express.
use std::io::{self, ErrorKind, Read, Write};

use super::transport::TransportError;

/// Largest payload a single frame can carry.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

pub(crate) const LENGTH_PREFIX_SIZE: usize = size_of::<u16>();

/// Prefix `payload` with its little-endian `u16` length.
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let length = u16::try_from(payload.len()).map_err(|_| TransportError::FrameTooLarge {
        size: payload.len(),
        max: MAX_PAYLOAD_SIZE,
    })?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read exactly one frame from `source` and return its payload.
///
/// Bytes following the frame are left unread in `source`.
pub fn read_frame<R: Read>(source: &mut R) -> Result<Vec<u8>, TransportError> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    source.read_exact(&mut prefix).map_err(read_error)?;

    let length = u16::from_le_bytes(prefix) as usize;
    let mut payload = vec![0u8; length];
    source.read_exact(&mut payload).map_err(read_error)?;

    Ok(payload)
}

/// Write an already encoded frame to `sink` and flush it.
pub fn write_frame<W: Write>(sink: &mut W, frame: &[u8]) -> Result<(), TransportError> {
    sink.write_all(frame).map_err(write_error)?;
    sink.flush().map_err(write_error)?;
    Ok(())
}

fn read_error(err: io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            TransportError::ConnectionClosed
        }
        // Read deadlines surface as WouldBlock on unix and TimedOut on windows.
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Io(err),
    }
}

fn write_error(err: io::Error) -> TransportError {
    match err.kind() {
        ErrorKind::BrokenPipe
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::WriteZero => TransportError::ConnectionClosed,
        ErrorKind::WouldBlock | ErrorKind::TimedOut => TransportError::Timeout,
        _ => TransportError::Write(err),
    }
}
