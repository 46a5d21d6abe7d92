//! The module defines XDR data types and constants for Network File System (NFS)
//! version 3, as defined in RFC 1813.
//!
//! Only the subset a read-only client needs is modelled here: file handles,
//! status codes, file attributes, and the arguments and results of LOOKUP and
//! READ.

// Preserve original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::fmt;
use std::io::Write;

use num_derive::{FromPrimitive, ToPrimitive};

use crate::{
    DeserializeBoolUnion, DeserializeStruct, SerializeBoolUnion, SerializeStruct,
};

use super::{DeserializeEnum, Deserialize, Serialize, SerializeEnum};

// Modules for different operation types
pub mod dir;
pub mod file;

// Section 2.2 Constants
/// The RPC program number for NFS version 3 service.
pub const PROGRAM: u32 = 100003;
/// The version number for NFS version 3 protocol.
pub const VERSION: u32 = 3;

// Section 2.4 Sizes
//
/// The maximum size in bytes of the opaque file handle.
pub const NFS3_FHSIZE: u32 = 64;

// Section 2.5 Basic Data Types
/// A string type used in NFS for filenames and paths.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct nfsstring(pub Vec<u8>);

impl nfsstring {
    /// Returns the length of the string in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for nfsstring {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for nfsstring {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for nfsstring {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for nfsstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

impl Serialize for nfsstring {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.0.serialize(dest)
    }
}

impl Deserialize for nfsstring {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        self.0.deserialize(src)
    }
}

/// Procedure numbers for NFS version 3 protocol.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug, FromPrimitive, ToPrimitive)]
pub enum NFSProgram {
    /// Do nothing - used primarily for performance measurement
    NFSPROC3_NULL = 0,
    /// Get file attributes
    NFSPROC3_GETATTR = 1,
    /// Set file attributes
    NFSPROC3_SETATTR = 2,
    /// Look up filename
    NFSPROC3_LOOKUP = 3,
    /// Check file access permission
    NFSPROC3_ACCESS = 4,
    /// Read from symbolic link
    NFSPROC3_READLINK = 5,
    /// Read from file
    NFSPROC3_READ = 6,
}

/// Filename type as defined in RFC 1813 section 2.5
/// String used for a component of a pathname
pub type filename3 = nfsstring;
/// File identifier as defined in RFC 1813 section 2.5
pub type fileid3 = u64;
/// User ID as defined in RFC 1813 section 2.5
pub type uid3 = u32;
/// Group ID as defined in RFC 1813 section 2.5
pub type gid3 = u32;
/// File size in bytes as defined in RFC 1813 section 2.5
pub type size3 = u64;
/// File offset in bytes as defined in RFC 1813 section 2.5
pub type offset3 = u64;
/// File mode bits as defined in RFC 1813 section 2.5
pub type mode3 = u32;
/// Count of bytes as defined in RFC 1813 section 2.5
pub type count3 = u32;

/// Status codes returned by NFS version 3 operations
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum nfsstat3 {
    /// Indicates the call completed successfully.
    NFS3_OK = 0,
    /// Not owner.
    NFS3ERR_PERM = 1,
    /// No such file or directory.
    NFS3ERR_NOENT = 2,
    /// I/O error.
    NFS3ERR_IO = 5,
    /// No such device or address.
    NFS3ERR_NXIO = 6,
    /// Permission denied.
    NFS3ERR_ACCES = 13,
    /// File exists.
    NFS3ERR_EXIST = 17,
    /// Attempt to do a cross-device hard link.
    NFS3ERR_XDEV = 18,
    /// No such device.
    NFS3ERR_NODEV = 19,
    /// Not a directory.
    NFS3ERR_NOTDIR = 20,
    /// Is a directory.
    NFS3ERR_ISDIR = 21,
    /// Invalid argument or unsupported argument for an operation.
    NFS3ERR_INVAL = 22,
    /// File too large.
    NFS3ERR_FBIG = 27,
    /// No space left on device.
    NFS3ERR_NOSPC = 28,
    /// Read-only file system.
    NFS3ERR_ROFS = 30,
    /// Too many hard links.
    NFS3ERR_MLINK = 31,
    /// The filename in an operation was too long.
    NFS3ERR_NAMETOOLONG = 63,
    /// An attempt was made to remove a directory that was not empty.
    NFS3ERR_NOTEMPTY = 66,
    /// Resource (quota) hard limit exceeded.
    NFS3ERR_DQUOT = 69,
    /// Invalid file handle.
    NFS3ERR_STALE = 70,
    /// Too many levels of remote in path.
    NFS3ERR_REMOTE = 71,
    /// Illegal NFS file handle.
    NFS3ERR_BADHANDLE = 10001,
    /// Update synchronization mismatch was detected during a SETATTR operation.
    NFS3ERR_NOT_SYNC = 10002,
    /// READDIR or READDIRPLUS cookie is stale
    NFS3ERR_BAD_COOKIE = 10003,
    /// Operation is not supported.
    NFS3ERR_NOTSUPP = 10004,
    /// Buffer or request is too small.
    NFS3ERR_TOOSMALL = 10005,
    /// An error occurred on the server which does not map to any
    /// of the legal NFS version 3 protocol error values.
    NFS3ERR_SERVERFAULT = 10006,
    /// An attempt was made to create an object of a type not
    /// supported by the server.
    NFS3ERR_BADTYPE = 10007,
    /// The server initiated the request, but was not able to
    /// complete it in a timely fashion.
    NFS3ERR_JUKEBOX = 10008,
}
impl SerializeEnum for nfsstat3 {}
impl DeserializeEnum for nfsstat3 {}

impl Default for nfsstat3 {
    fn default() -> Self {
        nfsstat3::NFS3ERR_SERVERFAULT
    }
}

/// File type enumeration as defined in RFC 1813 section 2.3.5
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ftype3 {
    /// Regular File
    #[default]
    NF3REG = 1,
    /// Directory
    NF3DIR = 2,
    /// Block Special Device
    NF3BLK = 3,
    /// Character Special Device
    NF3CHR = 4,
    /// Symbolic Link
    NF3LNK = 5,
    /// Socket
    NF3SOCK = 6,
    /// Named Pipe
    NF3FIFO = 7,
}
impl SerializeEnum for ftype3 {}
impl DeserializeEnum for ftype3 {}

/// Special device information for character and block special devices
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct specdata3 {
    /// Major device number
    pub specdata1: u32,
    /// Minor device number
    pub specdata2: u32,
}
DeserializeStruct!(specdata3, specdata1, specdata2);
SerializeStruct!(specdata3, specdata1, specdata2);

/// The NFS version 3 file handle.
///
/// The server is responsible for the internal format and interpretation of
/// the file handle; the client only ever passes it back by value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct nfs_fh3 {
    /// Raw file handle data (up to NFS3_FHSIZE bytes)
    pub data: Vec<u8>,
}
DeserializeStruct!(nfs_fh3, data);
SerializeStruct!(nfs_fh3, data);

impl From<Vec<u8>> for nfs_fh3 {
    fn from(data: Vec<u8>) -> Self {
        nfs_fh3 { data }
    }
}

/// NFS version 3 time structure
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct nfstime3 {
    /// Seconds since Unix epoch (January 1, 1970)
    pub seconds: u32,
    /// Nanoseconds (0-999999999)
    pub nseconds: u32,
}
DeserializeStruct!(nfstime3, seconds, nseconds);
SerializeStruct!(nfstime3, seconds, nseconds);

/// File attributes in NFS version 3 as defined in RFC 1813 section 2.3.5
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct fattr3 {
    /// Type of file (regular, directory, symbolic link, etc.)
    pub ftype: ftype3,
    /// File access mode bits
    pub mode: mode3,
    /// Number of hard links to the file
    pub nlink: u32,
    /// User ID of the file owner
    pub uid: uid3,
    /// Group ID of the file's group
    pub gid: gid3,
    /// File size in bytes
    pub size: size3,
    /// Size in bytes actually allocated to the file on the server's file system
    pub used: size3,
    /// Device ID information for character or block special files
    pub rdev: specdata3,
    /// File system identifier
    pub fsid: u64,
    /// File identifier (inode number)
    pub fileid: fileid3,
    /// Time of last access to the file data
    pub atime: nfstime3,
    /// Time of last modification to the file data
    pub mtime: nfstime3,
    /// Time of last status change
    pub ctime: nfstime3,
}
DeserializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);
SerializeStruct!(
    fattr3, ftype, mode, nlink, uid, gid, size, used, rdev, fsid, fileid, atime, mtime, ctime
);

/// Post-operation attributes as defined in RFC 1813 section 2.3.8.
/// Servers may omit them, in which case the client knows nothing new.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum post_op_attr {
    #[default]
    /// No attributes available
    Void,
    /// Attributes are available
    attributes(fattr3),
}
DeserializeBoolUnion!(post_op_attr, attributes, fattr3);
SerializeBoolUnion!(post_op_attr, attributes, fattr3);

impl post_op_attr {
    /// File size when attributes were returned.
    pub fn size(&self) -> Option<size3> {
        match self {
            post_op_attr::Void => None,
            post_op_attr::attributes(attr) => Some(attr.size),
        }
    }
}

/// Arguments for directory operations (specifying directory handle and name)
#[derive(Clone, Debug, Default)]
pub struct diropargs3 {
    /// Directory file handle
    pub dir: nfs_fh3,
    /// Name within the directory
    pub name: filename3,
}
DeserializeStruct!(diropargs3, dir, name);
SerializeStruct!(diropargs3, dir, name);
