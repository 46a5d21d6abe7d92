//! The UMNT procedure (procedure 3) of the MOUNT version 3 protocol
//! as defined in RFC 1813 Appendix I section I.4.4.

use tracing::debug;

use crate::error::Result;
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr::mount;
use crate::xfer::Transport;

/// Tells the server `path` is no longer mounted by this client.
pub fn unmount<T: Transport, C>(session: &mut Session<T, C>, path: &str, cont: C) -> Result<u32> {
    debug!("mountproc3_umnt({:?})", path);
    session.call(mount::MountProgram::MOUNTPROC3_UMNT as u32, path, cont)
}

/// UMNT has no results; only the RPC status matters.
pub fn decode_unmount_reply(reply: &Reply) -> Result<()> {
    reply.check()
}
