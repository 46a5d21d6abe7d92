//! The `LOOKUP` procedure (procedure 3) of NFS version 3
//! as defined in RFC 1813 section 3.3.3.
//!
//! `LOOKUP` translates one file name within a directory into the file handle
//! used by every later operation on that file.

use tracing::debug;

use super::expect_ok;
use crate::error::{Error, Result};
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr::{deserialize, nfs3};
use crate::xfer::Transport;

/// Submits `LOOKUP` of `name` in the directory `dir`.
pub fn lookup<T: Transport, C>(
    session: &mut Session<T, C>,
    dir: &nfs3::nfs_fh3,
    name: &str,
    cont: C,
) -> Result<u32> {
    let args = nfs3::dir::LOOKUP3args { dir: dir.clone(), name: name.into() };
    debug!("nfsproc3_lookup({:?})", args);
    session.call(nfs3::NFSProgram::NFSPROC3_LOOKUP as u32, &args, cont)
}

/// Decodes a `LOOKUP` reply into the handle of the object found.
pub fn decode_lookup_reply(reply: &Reply) -> Result<nfs3::nfs_fh3> {
    let mut body = reply.body()?;
    expect_ok(&mut body)?;
    let res = deserialize::<nfs3::dir::LOOKUP3resok>(&mut body).map_err(Error::decode)?;
    if res.object.data.len() > nfs3::NFS3_FHSIZE as usize {
        return Err(Error::protocol(format!("file handle of {} bytes", res.object.data.len())));
    }
    debug!("nfsproc3_lookup success {:#x} --> {:?}", reply.xid, res.object);
    Ok(res.object)
}
