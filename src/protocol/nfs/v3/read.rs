//! The READ procedure (procedure 6) of NFS version 3
//! as defined in RFC 1813 section 3.3.6.
//!
//! The client names a file handle, an offset and a byte count. On success the
//! server returns the file attributes after the read, the number of bytes
//! actually read, an EOF flag and the data.

use tracing::debug;

use super::expect_ok;
use crate::error::{Error, Result};
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr::{deserialize, nfs3};
use crate::xfer::Transport;

/// Decoded result of one READ.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadReply {
    /// Size from the post-op attributes, 0 when the server omitted them
    pub file_size: u64,
    pub count: u32,
    pub eof: bool,
    pub data: Vec<u8>,
}

/// Submits READ of `count` bytes of `file` starting at `offset`.
pub fn read<T: Transport, C>(
    session: &mut Session<T, C>,
    file: &nfs3::nfs_fh3,
    offset: u64,
    count: u32,
    cont: C,
) -> Result<u32> {
    let args = nfs3::file::READ3args { file: file.clone(), offset, count };
    debug!("nfsproc3_read({:?})", args);
    session.call(nfs3::NFSProgram::NFSPROC3_READ as u32, &args, cont)
}

pub fn decode_read_reply(reply: &Reply) -> Result<ReadReply> {
    let mut body = reply.body()?;
    expect_ok(&mut body)?;
    let res = deserialize::<nfs3::file::READ3resok>(&mut body).map_err(Error::decode)?;
    if res.count as usize != res.data.len() {
        return Err(Error::protocol(format!(
            "READ count {} does not match {} data bytes",
            res.count,
            res.data.len()
        )));
    }
    debug!("nfsproc3_read {:#x} --> count {} eof {}", reply.xid, res.count, res.eof);
    Ok(ReadReply {
        file_size: res.file_attributes.size().unwrap_or(0),
        count: res.count,
        eof: res.eof,
        data: res.data,
    })
}
