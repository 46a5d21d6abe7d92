//! Decoded reply header handed to a call's continuation.

use crate::error::{Error, Result};
use crate::protocol::xdr::rpc::{accept_body, opaque_auth, MSG_ACCEPTED, MSG_DENIED};

/// One reply, matched to its call by transaction id.
///
/// The header fields are kept as raw numbers so a continuation can tell a
/// denied call from a failed one. `payload` holds the procedure-specific
/// results that follow the header.
#[derive(Clone, Debug, Default)]
pub struct Reply {
    pub xid: u32,
    /// `MSG_ACCEPTED` or `MSG_DENIED`
    pub reply_state: u32,
    /// `accept_stat` for accepted replies, `reject_stat` for denied ones
    pub accept_state: u32,
    pub verifier: opaque_auth,
    pub payload: Vec<u8>,
}

impl Reply {
    /// Fails unless the call was accepted with `SUCCESS`.
    pub fn check(&self) -> Result<()> {
        match self.reply_state {
            MSG_ACCEPTED if self.accept_state == accept_body::SUCCESS.stat() => Ok(()),
            MSG_ACCEPTED => Err(Error::protocol(format!(
                "call {:#x} not executed, accept_stat {}",
                self.xid, self.accept_state
            ))),
            MSG_DENIED => Err(Error::protocol(format!(
                "call {:#x} denied, reject_stat {}",
                self.xid, self.accept_state
            ))),
            other => Err(Error::protocol(format!("call {:#x}: bad reply_stat {other}", self.xid))),
        }
    }

    /// Payload cursor, available only for successful replies.
    pub fn body(&self) -> Result<&[u8]> {
        self.check()?;
        Ok(&self.payload)
    }
}
