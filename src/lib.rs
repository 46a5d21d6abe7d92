//! NFS Boot - a non-blocking ONC RPC client and NFS version 3 file fetcher
//!
//! This library opens a file exported over NFS and streams its bytes to a
//! consumer, the way a network boot loader fetches a kernel or an initrd.
//! Three RPC services are chained for that: the port mapper, the mount
//! service and the NFS service itself.
//!
//! ## Main Components
//!
//! - `protocol`: XDR encoding and decoding, the RPC client session and the
//!   PORTMAP, MOUNT and NFSv3 client procedures.
//!
//! - `open`: the state machine that resolves `/mountpoint/filename` into a
//!   byte stream. It never blocks; it is driven by transport events.
//!
//! - `xfer`: the transport, connector and data sink interfaces the state
//!   machine plugs into.
//!
//! - `tcp`: a tokio driver that runs the state machine over real TCP
//!   connections.
//!
//! ## Standards Compliance
//!
//! This implementation follows these RFCs:
//! - RFC 1813: NFS Version 3 Protocol Specification
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2 (obsoletes RFC 1831)
//! - RFC 4506: XDR: External Data Representation Standard (obsoletes RFC 1832)
//! - RFC 1833: Binding Protocols for ONC RPC Version 2
//!
//! ## Usage
//!
//! Call [`tcp::fetch`] with an [`open::NfsRequest`] and a [`xfer::DataSink`],
//! or drive [`open::NfsOpen`] from your own event loop.

pub mod config;
pub mod error;
pub mod open;
pub mod protocol;
pub mod tcp;
pub mod xfer;

pub use error::{Error, Result};
pub use protocol::xdr;
