//! RPC message framing as specified in RFC 5531 section 11 (Record Marking Standard).
//!
//! On a byte stream every record is preceded by a 4-byte header: the lower
//! 31 bits carry the fragment length and the most significant bit marks the
//! last fragment of the record.
//!
//! This client never splits a message: every record it writes is exactly one
//! fragment with the last-fragment bit set, and every fragment it accepts must
//! carry that bit too. Multi-fragment replies are reported as protocol errors
//! instead of being reassembled.

use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::rpc::MAX_RPC_RECORD_LENGTH;

/// Highest bit of the record mark, set on the final fragment of a record.
pub const LAST_FRAGMENT: u32 = 1 << 31;

/// Maximum fragment size is 2^31 - 1 bytes
pub const MAX_FRAGMENT_SIZE: usize = (1 << 31) - 1;

/// Size of the record mark in bytes.
pub const RECORD_MARK_SIZE: usize = 4;

/// Builds the record mark of a single, final fragment of `length` bytes.
pub fn record_mark(length: usize) -> Result<u32> {
    if length > MAX_FRAGMENT_SIZE {
        return Err(Error::protocol(format!("RPC message of {length} bytes needs fragmentation")));
    }
    Ok(length as u32 | LAST_FRAGMENT)
}

/// Splits a record mark into fragment length and last-fragment flag.
pub fn parse_record_mark(mark: u32) -> (usize, bool) {
    ((mark & !LAST_FRAGMENT) as usize, mark & LAST_FRAGMENT != 0)
}

/// Writes the record mark into the space reserved at the front of `message`.
///
/// `message` must start with [`RECORD_MARK_SIZE`] placeholder bytes.
pub fn seal_record(message: &mut [u8]) -> Result<()> {
    let body_len = message
        .len()
        .checked_sub(RECORD_MARK_SIZE)
        .ok_or_else(|| Error::protocol("RPC message is shorter than its record mark"))?;
    let mark = record_mark(body_len)?;
    message[..RECORD_MARK_SIZE].copy_from_slice(&mark.to_be_bytes());
    Ok(())
}

/// Validates one inbound fragment (record mark included) and returns its body.
pub fn fragment_body(frame: &[u8]) -> Result<&[u8]> {
    if frame.len() < RECORD_MARK_SIZE {
        return Err(Error::protocol("fragment shorter than its record mark"));
    }
    let (mark, body) = frame.split_at(RECORD_MARK_SIZE);
    let mark = u32::from_be_bytes([mark[0], mark[1], mark[2], mark[3]]);
    let (length, is_last) = parse_record_mark(mark);
    if !is_last {
        return Err(Error::protocol("multi-fragment RPC records are not supported"));
    }
    if length != body.len() {
        return Err(Error::protocol(format!(
            "fragment length mismatch: header says {length}, got {}",
            body.len()
        )));
    }
    Ok(body)
}

/// Reads a single record-marked fragment from a stream.
///
/// Returns the fragment with its record mark still in front, ready for
/// [`fragment_body`]. The last-fragment flag is not interpreted here; the
/// session decides what to do with it.
pub async fn read_fragment(socket: &mut (impl AsyncRead + Unpin)) -> Result<Vec<u8>, anyhow::Error> {
    let mut header_buf = [0_u8; RECORD_MARK_SIZE];
    socket.read_exact(&mut header_buf).await?;
    let (length, is_last) = parse_record_mark(u32::from_be_bytes(header_buf));
    trace!("Reading fragment length:{}, last:{}", length, is_last);
    if length > MAX_RPC_RECORD_LENGTH {
        return Err(anyhow::anyhow!(
            "RPC record length {} exceeds max {}",
            length,
            MAX_RPC_RECORD_LENGTH
        ));
    }
    let mut frame = Vec::new();
    frame.try_reserve_exact(RECORD_MARK_SIZE + length)?;
    frame.extend_from_slice(&header_buf);
    frame.resize(RECORD_MARK_SIZE + length, 0);
    socket.read_exact(&mut frame[RECORD_MARK_SIZE..]).await?;
    trace!("Finishing Reading fragment length:{}, last:{}", length, is_last);
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_mark_always_sets_last_fragment() {
        assert_eq!(record_mark(0).unwrap(), 0x8000_0000);
        assert_eq!(record_mark(40).unwrap(), 0x8000_0028);
        assert_eq!(parse_record_mark(0x8000_0028), (40, true));
        assert_eq!(parse_record_mark(0x0000_0028), (40, false));
    }

    #[test]
    fn fragment_without_last_bit_is_rejected() {
        let mut frame = 4_u32.to_be_bytes().to_vec();
        frame.extend_from_slice(&[0, 0, 0, 1]);
        assert!(fragment_body(&frame).unwrap_err().is_protocol());
    }

    #[test]
    fn fragment_length_must_match() {
        let mut frame = (LAST_FRAGMENT | 8).to_be_bytes().to_vec();
        frame.extend_from_slice(&[0, 0, 0, 1]);
        assert!(fragment_body(&frame).is_err());
    }

    #[tokio::test]
    async fn reads_one_fragment_with_its_mark() {
        let mut input: &[u8] = &[0x80, 0, 0, 4, 1, 2, 3, 4, 0xff];
        let frame = read_fragment(&mut input).await.unwrap();
        assert_eq!(frame, vec![0x80, 0, 0, 4, 1, 2, 3, 4]);
        assert_eq!(fragment_body(&frame).unwrap(), &[1, 2, 3, 4]);
    }
}
