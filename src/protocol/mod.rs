//! Protocol module implements the client side of the ONC RPC protocol suite
//! needed to read a file over NFS version 3.
//!
//! - `xdr`: External Data Representation (XDR) for serialization and deserialization
//!   of data structures according to RFC 4506.
//!
//! - `rpc`: Remote Procedure Call (RPC) client sessions as defined in RFC 5531:
//!   message framing, transaction ids, reply matching and flow control.
//!
//! - `nfs`: call builders and reply decoders for the PORTMAP, MOUNT and NFSv3
//!   procedures the client uses.

pub mod nfs;
pub mod rpc;
pub mod xdr;
