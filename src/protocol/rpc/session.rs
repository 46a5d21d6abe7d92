//! One RPC client identity multiplexed over one transport binding.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

use tracing::{debug, trace, warn};

use super::pending::{CallQueue, PendingReplies};
use super::reply::Reply;
use super::wire::{self, RECORD_MARK_SIZE};
use crate::error::{Error, Result};
use crate::protocol::xdr::rpc::{
    opaque_auth, reply_body, Credential, MSG_ACCEPTED, MSG_CALL, MSG_DENIED, MSG_REPLY, RPC_VERSION,
};
use crate::protocol::xdr::{deserialize, encoded_len, Serialize};
use crate::xfer::{DeliverError, Transport};

/// xid, message kind, rpcvers, program, version, procedure
const CALL_HEADER_SIZE: usize = 6 * 4;

/// Client side of an RPC program over a single transport.
///
/// The session assigns transaction ids, encodes calls, holds them back while
/// the transport has no window, and matches replies to the continuation the
/// caller registered. Continuations are plain values of type `C`: the session
/// never runs them, it hands them back from [`Session::on_frame`].
pub struct Session<T: Transport, C> {
    transport: T,
    program: u32,
    version: u32,
    credential: Credential,
    verifier: Credential,
    next_xid: u32,
    queue: CallQueue,
    replies: PendingReplies<C>,
    closed: bool,
}

impl<T: Transport, C> Session<T, C> {
    pub fn new(transport: T, program: u32, version: u32, credential: Credential, verifier: Credential) -> Self {
        Self::with_initial_xid(transport, program, version, credential, verifier, random_xid())
    }

    /// Same as [`Session::new`] with a fixed first transaction id.
    pub fn with_initial_xid(
        transport: T,
        program: u32,
        version: u32,
        credential: Credential,
        verifier: Credential,
        initial_xid: u32,
    ) -> Self {
        Self {
            transport,
            program,
            version,
            credential,
            verifier,
            next_xid: initial_xid,
            queue: CallQueue::new(),
            replies: PendingReplies::new(),
            closed: false,
        }
    }

    /// Encodes and submits a call to `procedure` with `args` as its parameters.
    ///
    /// Returns the transaction id. The call is sent right away when the
    /// transport has window and nothing is queued ahead of it, otherwise it
    /// waits in the queue. Either way `cont` is registered and will come back
    /// from [`Session::on_frame`] with the reply.
    ///
    /// Nothing is registered when this fails.
    pub fn call<A: Serialize + ?Sized>(&mut self, procedure: u32, args: &A, cont: C) -> Result<u32> {
        if self.closed {
            return Err(Error::ConnectionReset);
        }

        let encode_error = |program: u32, e: std::io::Error| {
            Error::protocol(format!("cannot encode call to {program}/{procedure}: {e}"))
        };
        let args_len = encoded_len(args).map_err(|e| encode_error(self.program, e))?;
        let xid = self.allocate_xid();
        let capacity = RECORD_MARK_SIZE
            + CALL_HEADER_SIZE
            + self.credential.encoded_len()
            + self.verifier.encoded_len()
            + args_len;
        let mut record = Vec::new();
        record.try_reserve_exact(capacity)?;
        record.extend_from_slice(&[0; RECORD_MARK_SIZE]);
        self.encode_call(xid, procedure, args, &mut record)
            .map_err(|e| encode_error(self.program, e))?;
        wire::seal_record(&mut record)?;

        self.replies.reserve_one()?;
        self.queue.reserve_one()?;

        debug!(
            "call xid {:#x} prog {} vers {} proc {} ({} bytes)",
            xid,
            self.program,
            self.version,
            procedure,
            record.len()
        );
        self.replies.insert(xid, cont);
        if !self.queue.is_empty() || self.transport.window() == 0 {
            self.queue.push_back(record);
            return Ok(xid);
        }
        match self.transport.deliver(record) {
            Ok(()) => {}
            Err(DeliverError::Refused(record)) => {
                trace!("transport refused xid {:#x}, queueing", xid);
                self.queue.push_back(record);
            }
            Err(DeliverError::Broken(e)) => {
                self.replies.remove(xid);
                return Err(Error::Transport(e));
            }
        }
        Ok(xid)
    }

    fn encode_call<A: Serialize + ?Sized>(
        &self,
        xid: u32,
        procedure: u32,
        args: &A,
        dest: &mut Vec<u8>,
    ) -> std::io::Result<()> {
        xid.serialize(dest)?;
        MSG_CALL.serialize(dest)?;
        RPC_VERSION.serialize(dest)?;
        self.program.serialize(dest)?;
        self.version.serialize(dest)?;
        procedure.serialize(dest)?;
        self.credential.serialize(dest)?;
        self.verifier.serialize(dest)?;
        args.serialize(dest)
    }

    /// Next unused transaction id. Wraps around and skips ids still awaiting a
    /// reply.
    fn allocate_xid(&mut self) -> u32 {
        loop {
            let xid = self.next_xid;
            self.next_xid = self.next_xid.wrapping_add(1);
            if !self.replies.contains(xid) {
                return xid;
            }
        }
    }

    /// Sends queued calls in order while the transport keeps accepting them.
    ///
    /// A refused call stays at the head of the queue for the next window
    /// change. Returns how many calls were sent.
    pub fn on_window_changed(&mut self) -> Result<usize> {
        let mut sent = 0;
        while !self.closed && self.transport.window() > 0 {
            let Some(record) = self.queue.pop_front() else {
                break;
            };
            trace!("flushing queued call of {} bytes", record.len());
            match self.transport.deliver(record) {
                Ok(()) => sent += 1,
                Err(DeliverError::Refused(record)) => {
                    self.queue.push_front(record);
                    break;
                }
                Err(DeliverError::Broken(e)) => return Err(Error::Transport(e)),
            }
        }
        Ok(sent)
    }

    /// Parses one inbound fragment, record mark included.
    ///
    /// Returns the continuation registered for the reply's xid together with
    /// the decoded reply, whatever its status. Replies nobody waits for are
    /// dropped and yield `None`.
    pub fn on_frame(&mut self, frame: &[u8]) -> Result<Option<(C, Reply)>> {
        if self.closed {
            trace!("dropping frame on closed session");
            return Ok(None);
        }

        let mut body = wire::fragment_body(frame)?;
        let xid = deserialize::<u32>(&mut body).map_err(Error::decode)?;
        let kind = deserialize::<u32>(&mut body).map_err(Error::decode)?;
        if kind != MSG_REPLY {
            return Err(Error::protocol(format!("expected reply, got message type {kind} (xid {xid:#x})")));
        }

        let Some(cont) = self.replies.remove(xid) else {
            warn!("discarding reply with unknown xid {:#x}", xid);
            return Ok(None);
        };

        let reply = decode_reply(xid, body)?;
        debug!(
            "reply xid {:#x} reply_stat {} accept_stat {} ({} payload bytes)",
            xid,
            reply.reply_state,
            reply.accept_state,
            reply.payload.len()
        );
        Ok(Some((cont, reply)))
    }

    /// Releases every queued call and pending continuation and shuts the
    /// transport down with `reason`. Later calls are no-ops.
    pub fn close(&mut self, reason: Option<&Error>) {
        if self.closed {
            return;
        }
        self.closed = true;
        debug!(
            "closing session prog {} ({} queued, {} awaiting reply)",
            self.program,
            self.queue.len(),
            self.replies.len()
        );
        self.queue.clear();
        self.replies.clear();
        self.transport.shutdown(reason);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Calls submitted but not yet handed to the transport.
    pub fn pending_calls(&self) -> usize {
        self.queue.len()
    }

    /// Calls still waiting for their reply.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }

    pub fn program(&self) -> u32 {
        self.program
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

fn decode_reply(xid: u32, mut body: &[u8]) -> Result<Reply> {
    let src = &mut body;
    let header = deserialize::<reply_body>(src).map_err(Error::decode)?;
    let (reply_state, accept_state, verifier) = match header {
        reply_body::MSG_ACCEPTED(accepted) => (MSG_ACCEPTED, accepted.reply_data.stat(), accepted.verf),
        reply_body::MSG_DENIED(rejected) => {
            debug!("call {:#x} denied: {:?}", xid, rejected);
            (MSG_DENIED, rejected.stat(), opaque_auth::default())
        }
    };

    let mut payload = Vec::new();
    payload.try_reserve_exact(src.len())?;
    payload.extend_from_slice(src);
    Ok(Reply { xid, reply_state, accept_state, verifier, payload })
}

/// Per-session starting xid, so a restarted client does not reuse ids a
/// server may still remember.
fn random_xid() -> u32 {
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u32(std::process::id());
    hasher.finish() as u32
}
