//! The MNT procedure (procedure 1) of the MOUNT version 3 protocol
//! as defined in RFC 1813 Appendix I section I.4.2.
//!
//! MNT takes a directory path exported by the server and, if the server
//! agrees, returns the file handle of that directory along with the
//! authentication flavors the server accepts for it.

use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr::nfs3::nfs_fh3;
use crate::protocol::xdr::{deserialize, mount};
use crate::xfer::Transport;

/// Submits MNT for `path` on a session bound to the mount program.
pub fn mount<T: Transport, C>(session: &mut Session<T, C>, path: &str, cont: C) -> Result<u32> {
    debug!("mountproc3_mnt({:?})", path);
    if path.len() > mount::MNTPATHLEN as usize {
        return Err(Error::InvalidRequest(format!("mount path of {} bytes", path.len())));
    }
    session.call(mount::MountProgram::MOUNTPROC3_MNT as u32, path, cont)
}

/// Decodes a MNT reply into the root file handle of the mounted directory.
pub fn decode_mount_reply(reply: &Reply) -> Result<nfs_fh3> {
    let mut body = reply.body()?;
    let status = deserialize::<mount::mountstat3>(&mut body).map_err(Error::decode)?;
    if status != mount::mountstat3::MNT3_OK {
        debug!("\t{:#x} --> {:?}", reply.xid, status);
        return Err(Error::Mount(status));
    }
    let res = deserialize::<mount::mountres3_ok>(&mut body).map_err(Error::decode)?;
    if res.fhandle.len() > mount::FHSIZE3 as usize {
        return Err(Error::protocol(format!("mount handle of {} bytes", res.fhandle.len())));
    }
    debug!("\t{:#x} --> {:?}", reply.xid, res);
    Ok(nfs_fh3::from(res.fhandle))
}
