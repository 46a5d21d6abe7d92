//! Error type shared by the RPC session, the protocol clients and the
//! NFS-open pipeline.
//!
//! Failures fall into a few coarse kinds: the transport broke, the remote
//! side said something we could not accept, or we could not allocate memory
//! for a call. None of them is retried; any of them aborts a whole open.

use std::io;

use crate::protocol::xdr::mount::mountstat3;
use crate::protocol::xdr::nfs3::nfsstat3;

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connect failure, reset, or failed write on a transport binding.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// A transport closed before the transfer completed.
    #[error("connection closed before the transfer completed")]
    ConnectionReset,

    /// Non-zero accept status, denied or malformed reply, unexpected message
    /// kind, or an unset last-fragment bit.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The mount service answered with a non-OK status.
    #[error("mount failed: {0:?}")]
    Mount(mountstat3),

    /// The file service answered with a non-OK status.
    #[error("nfs call failed: {0:?}")]
    Nfs(nfsstat3),

    /// Allocation failed while building a call or a queue entry.
    #[error("out of memory")]
    OutOfMemory,

    /// The request descriptor cannot be opened.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Wraps a codec failure on inbound data as a protocol error.
    pub fn decode(err: io::Error) -> Self {
        Error::Protocol(format!("malformed reply: {err}"))
    }

    /// True for the generic protocol-error kind, including non-OK service
    /// statuses.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Error::Protocol(_) | Error::Mount(_) | Error::Nfs(_))
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(_: std::collections::TryReserveError) -> Self {
        Error::OutOfMemory
    }
}
