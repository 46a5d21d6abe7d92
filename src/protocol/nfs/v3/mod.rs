//! NFS version 3 client procedures as specified in RFC 1813.
//!
//! Only the two procedures needed to fetch a file by name are provided:
//! `LOOKUP` (procedure 3) and `READ` (procedure 6).

mod lookup;
mod read;

pub use lookup::{decode_lookup_reply, lookup};
pub use read::{decode_read_reply, read, ReadReply};

use crate::error::{Error, Result};
use crate::protocol::xdr::{deserialize, nfs3};

/// Consumes the leading `nfsstat3` of a result and fails on anything but
/// `NFS3_OK`.
fn expect_ok(body: &mut &[u8]) -> Result<()> {
    match deserialize::<nfs3::nfsstat3>(body).map_err(Error::decode)? {
        nfs3::nfsstat3::NFS3_OK => Ok(()),
        stat => Err(Error::Nfs(stat)),
    }
}
