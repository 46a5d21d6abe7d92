//! RPC (Remote Procedure Call) client as specified in RFC 5531 (previously RFC 1057).
//!
//! A [`Session`] binds one program/version and one credential to one
//! transport. It frames calls with the Record Marking Standard, keeps calls
//! that the transport cannot take yet in a FIFO queue, and pairs each reply
//! with the continuation registered for its transaction id.
//!
//! The implementation covers:
//!
//! 1. Message framing for TCP using the Record Marking Standard
//! 2. Transaction id assignment and reply demultiplexing
//! 3. Authentication (AUTH_NONE and AUTH_SYS)
//! 4. Flow-control aware delivery with ordered queuing

mod pending;
mod reply;
mod session;
pub mod wire;

pub use pending::{CallQueue, PendingReplies};
pub use reply::Reply;
pub use session::Session;

/// Upper bound on a single inbound record, protects the reader from a
/// corrupted record mark.
pub const MAX_RPC_RECORD_LENGTH: usize = 1024 * 1024;
