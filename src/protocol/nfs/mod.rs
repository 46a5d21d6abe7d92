//! Client halves of the three ONC RPC services needed to open a file:
//!
//! - `portmap`: the PORTMAP protocol (RFC 1833), used to find the ports the
//!   mount and file services listen on.
//!
//! - `mount`: the MOUNT protocol of RFC 1813 Appendix I, which turns an
//!   exported path into the root file handle and releases it afterwards.
//!
//! - `v3`: the NFS version 3 procedures (RFC 1813) used to resolve a name in
//!   the mounted directory and to read the file.
//!
//! Each procedure comes as a pair: a call builder that submits the request on
//! a [`Session`](crate::protocol::rpc::Session), and a decoder that turns the
//! matching [`Reply`](crate::protocol::rpc::Reply) into a typed result. The
//! decoders reject any reply that was not accepted with `SUCCESS`.

pub mod mount;
pub mod portmap;
pub mod v3;
