//! Browser native messaging frames: a 4-byte little-endian length, then the payload.

use std::io::{self, Read, Write};

use thiserror::Error;

/// Largest payload accepted from the browser.
pub const MAX_MESSAGE_LEN: u32 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("invalid message length: {0}")]
    InvalidLength(u32),
    #[error("message too large to send: {0} bytes")]
    TooLarge(usize),
    #[error("failed to read message: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write message: {0}")]
    Write(#[source] io::Error),
}

/// Read one frame. `Ok(None)` means the browser closed the pipe between frames.
pub fn read_message<R: Read>(reader: &mut R) -> Result<Option<Vec<u8>>, FrameError> {
    let mut len_buf = [0u8; 4];
    if !read_prefix(reader, &mut len_buf)? {
        return Ok(None);
    }

    let len = u32::from_le_bytes(len_buf);
    if len == 0 || len > MAX_MESSAGE_LEN {
        return Err(FrameError::InvalidLength(len));
    }

    let mut message = vec![0u8; len as usize];
    reader.read_exact(&mut message).map_err(FrameError::Read)?;
    Ok(Some(message))
}

/// Discard the `len` payload bytes of a rejected frame so the next prefix lines up.
///
/// Stops early at EOF; the following `read_message` then reports the disconnect.
pub fn skip_payload<R: Read>(reader: &mut R, len: u32) -> Result<u64, FrameError> {
    io::copy(&mut reader.by_ref().take(u64::from(len)), &mut io::sink()).map_err(FrameError::Read)
}

/// Write one frame and flush it.
pub fn write_message<W: Write>(writer: &mut W, message: &[u8]) -> Result<(), FrameError> {
    let len = u32::try_from(message.len()).map_err(|_| FrameError::TooLarge(message.len()))?;
    let write = |writer: &mut W| -> io::Result<()> {
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(message)?;
        writer.flush()
    };
    write(writer).map_err(FrameError::Write)
}

/// Fill the length prefix; returns false on EOF before the first byte.
fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8; 4]) -> Result<bool, FrameError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(FrameError::Read(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated length prefix",
                )))
            }
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(FrameError::Read(err)),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn reads_consecutive_frames_then_eof() {
        let mut input = frame(b"{\"a\":1}");
        input.extend(frame(b"{}"));
        let mut reader = Cursor::new(input);

        assert_eq!(
            read_message(&mut reader).expect("first").as_deref(),
            Some(&b"{\"a\":1}"[..])
        );
        assert_eq!(
            read_message(&mut reader).expect("second").as_deref(),
            Some(&b"{}"[..])
        );
        assert!(read_message(&mut reader).expect("eof").is_none());
    }

    #[test]
    fn rejects_zero_and_oversized_lengths() {
        let mut zero = Cursor::new(0u32.to_le_bytes().to_vec());
        assert!(matches!(
            read_message(&mut zero),
            Err(FrameError::InvalidLength(0))
        ));

        let too_big = MAX_MESSAGE_LEN + 1;
        let mut big = Cursor::new(too_big.to_le_bytes().to_vec());
        assert!(matches!(
            read_message(&mut big),
            Err(FrameError::InvalidLength(len)) if len == too_big
        ));
    }

    #[test]
    fn skipping_an_oversized_payload_resyncs_the_stream() {
        let too_big = MAX_MESSAGE_LEN + 16;
        let mut input = too_big.to_le_bytes().to_vec();
        input.extend(vec![b'x'; too_big as usize]);
        input.extend(frame(b"{}"));
        let mut reader = Cursor::new(input);

        let Err(FrameError::InvalidLength(len)) = read_message(&mut reader) else {
            panic!("oversized frame must be rejected");
        };
        assert_eq!(skip_payload(&mut reader, len).expect("skip"), u64::from(too_big));
        assert_eq!(
            read_message(&mut reader).expect("next").as_deref(),
            Some(&b"{}"[..])
        );
    }

    #[test]
    fn truncated_frames_are_read_errors() {
        let mut short_prefix = Cursor::new(vec![5u8, 0]);
        assert!(matches!(
            read_message(&mut short_prefix),
            Err(FrameError::Read(_))
        ));

        let mut input = frame(b"hello");
        input.truncate(6);
        let mut short_body = Cursor::new(input);
        assert!(matches!(
            read_message(&mut short_body),
            Err(FrameError::Read(_))
        ));
    }

    #[test]
    fn writes_length_prefixed_frames() {
        let mut out = Vec::new();
        write_message(&mut out, b"{\"status\":\"success\"}").expect("write");
        assert_eq!(out, frame(b"{\"status\":\"success\"}"));
    }
}
