//! MOUNT protocol client for NFS version 3 as specified in RFC 1813 Appendix I.
//! https://datatracker.ietf.org/doc/html/rfc1813#appendix-I

mod mnt;
mod umnt;

pub use mnt::{decode_mount_reply, mount};
pub use umnt::{decode_unmount_reply, unmount};
