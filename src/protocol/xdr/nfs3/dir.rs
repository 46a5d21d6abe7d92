//! Module contains XDR data structures for the LOOKUP procedure (procedure 3)
//! of the NFS version 3 protocol as defined in RFC 1813 section 3.3.3.

// Preserve original RFC naming conventions for consistency with the NFS version 3 protocol specification
#![allow(non_camel_case_types)]

use super::*;

/// Arguments for the LOOKUP procedure: the directory to search and the name to find
pub type LOOKUP3args = diropargs3;

/// Successful response for the LOOKUP procedure
#[derive(Clone, Debug, Default)]
pub struct LOOKUP3resok {
    /// File handle of the object that was found
    pub object: nfs_fh3,
    /// Attributes of the object
    pub obj_attributes: post_op_attr,
    /// Attributes of the searched directory
    pub dir_attributes: post_op_attr,
}
DeserializeStruct!(LOOKUP3resok, object, obj_attributes, dir_attributes);
SerializeStruct!(LOOKUP3resok, object, obj_attributes, dir_attributes);
