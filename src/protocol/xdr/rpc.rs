//! This module provides data structures for the Remote Procedure Call (RPC) protocol
//! as defined in RFC 5531 (previously RFC 1057). These structures handle serialization and deserialization
//! of RPC messages exchanged between this client and remote services.

// Keep original RFC naming conventions for consistency with the specification
#![allow(non_camel_case_types)]

use std::io::Write;

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// RPC protocol version carried in every call.
pub const RPC_VERSION: u32 = 2;

/// Message type discriminant of a call.
pub const MSG_CALL: u32 = 0;
/// Message type discriminant of a reply.
pub const MSG_REPLY: u32 = 1;

/// Reply status of a call the server accepted.
pub const MSG_ACCEPTED: u32 = 0;
/// Reply status of a call the server refused.
pub const MSG_DENIED: u32 = 1;

/// Authentication status codes indicating why authentication failed
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum auth_stat {
    /// Invalid credentials provided by client (checksum/signature verification failed)
    #[default]
    AUTH_BADCRED = 1,
    /// Credentials rejected - client needs to establish a new session
    AUTH_REJECTEDCRED = 2,
    /// Invalid verifier provided by client (checksum/signature verification failed)
    AUTH_BADVERF = 3,
    /// Verifier rejected due to expiration or replay attempt
    AUTH_REJECTEDVERF = 4,
    /// Authentication mechanism too weak for requested operation
    AUTH_TOOWEAK = 5,
    /// Bogus response verifier
    AUTH_INVALIDRESP = 6,
    /// Some unknown reason
    AUTH_FAILED = 7,
}
impl SerializeEnum for auth_stat {}
impl DeserializeEnum for auth_stat {}

/// Authentication flavor (mechanism) identifiers for RPC
#[derive(Copy, Clone, Debug, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum auth_flavor {
    /// No authentication
    AUTH_NULL = 0,
    /// UNIX-style authentication (uid/gid), also known as AUTH_SYS
    AUTH_UNIX = 1,
    /// Short-form authentication
    AUTH_SHORT = 2,
    /// DES authentication
    AUTH_DES = 3,
}
impl SerializeEnum for auth_flavor {}
impl DeserializeEnum for auth_flavor {}

/// UNIX-style credentials used for authentication
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct auth_unix {
    /// Arbitrary id generated by the caller
    pub stamp: u32,
    /// The name of the client machine
    pub machinename: String,
    /// The effective user ID of the caller
    pub uid: u32,
    /// The effective group ID of the caller
    pub gid: u32,
    /// A list of additional group IDs for the caller
    pub gids: Vec<u32>,
}
DeserializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);
SerializeStruct!(auth_unix, stamp, machinename, uid, gid, gids);

/// Authentication data structure used in RPC protocol for both client and server authentication.
///
/// Call messages contain two auth fields (credentials and verifier), reply
/// messages contain one (the response verifier). Each is an `opaque_auth`: an
/// `auth_flavor` identifying the mechanism followed by opaque bytes whose
/// format the mechanism defines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct opaque_auth {
    /// The authentication mechanism being used
    pub flavor: auth_flavor,
    /// The opaque authentication data associated with that mechanism
    pub body: Vec<u8>,
}
DeserializeStruct!(opaque_auth, flavor, body);
SerializeStruct!(opaque_auth, flavor, body);

impl Default for opaque_auth {
    fn default() -> opaque_auth {
        opaque_auth { flavor: auth_flavor::AUTH_NULL, body: Vec::new() }
    }
}

/// Credential (or verifier) attached to every call of a session.
///
/// On the wire this is an `opaque_auth`: flavor, body length, body. The
/// `System` body is the `auth_unix` structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Credential {
    /// AUTH_NONE, empty body
    #[default]
    None,
    /// AUTH_SYS
    System(auth_unix),
}

impl Credential {
    /// Builds an AUTH_SYS credential with no auxiliary groups.
    pub fn system(hostname: impl Into<String>, uid: u32, gid: u32) -> Self {
        Credential::System(auth_unix {
            stamp: 0,
            machinename: hostname.into(),
            uid,
            gid,
            gids: Vec::new(),
        })
    }

    pub fn flavor(&self) -> auth_flavor {
        match self {
            Credential::None => auth_flavor::AUTH_NULL,
            Credential::System(_) => auth_flavor::AUTH_UNIX,
        }
    }

    /// Length in bytes of the encoded body, without flavor and length words.
    pub fn body_len(&self) -> usize {
        match self {
            Credential::None => 0,
            Credential::System(sys) => {
                let name = sys.machinename.len();
                4 + 4 + name + padding_len(name) + 4 + 4 + 4 + 4 * sys.gids.len()
            }
        }
    }

    /// Length in bytes of the full encoding.
    pub fn encoded_len(&self) -> usize {
        8 + self.body_len()
    }
}

impl Serialize for Credential {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.flavor().serialize(dest)?;
        match self {
            Credential::None => 0_u32.serialize(dest),
            Credential::System(sys) => {
                let body = to_vec(sys)?;
                body.serialize(dest)
            }
        }
    }
}

impl Deserialize for Credential {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        let mut probe = *src;
        let auth = deserialize::<opaque_auth>(&mut probe)?;
        *self = match auth.flavor {
            auth_flavor::AUTH_NULL => Credential::None,
            auth_flavor::AUTH_UNIX => {
                let mut body = auth.body.as_slice();
                let sys = deserialize::<auth_unix>(&mut body)?;
                if !body.is_empty() {
                    return Err(invalid_data("trailing bytes in AUTH_SYS body"));
                }
                Credential::System(sys)
            }
            _ => return Err(invalid_data("unsupported credential flavor")),
        };
        *src = probe;
        Ok(())
    }
}

/// RPC message structure as defined in RFC 5531 (previously RFC 1057).
///
/// Each RPC message begins with a transaction identifier (xid) followed by a
/// discriminated union containing either a CALL or REPLY message body.
/// The xid in a REPLY always matches the xid from the initiating CALL, which
/// is how the client pairs replies with outstanding calls.
#[derive(Clone, Debug, Default)]
pub struct rpc_msg {
    /// Transaction identifier used to match calls and replies
    pub xid: u32,
    /// The body of the RPC message (call or reply)
    pub body: rpc_body,
}
DeserializeStruct!(rpc_msg, xid, body);
SerializeStruct!(rpc_msg, xid, body);

/// The body of an RPC message, which can be either a call or a reply
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug)]
pub enum rpc_body {
    /// A call to a remote procedure
    CALL(call_body),
    /// A reply from a remote procedure
    REPLY(reply_body),
}

impl Default for rpc_body {
    fn default() -> rpc_body {
        rpc_body::CALL(call_body::default())
    }
}

impl Serialize for rpc_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            rpc_body::CALL(v) => {
                MSG_CALL.serialize(dest)?;
                v.serialize(dest)?;
            }
            rpc_body::REPLY(v) => {
                MSG_REPLY.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }
}

impl Deserialize for rpc_body {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            MSG_CALL => *self = rpc_body::CALL(deserialize(src)?),
            MSG_REPLY => *self = rpc_body::REPLY(deserialize(src)?),
            msg_type => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid message type in rpc_body: {msg_type}"),
                ))
            }
        }

        Ok(())
    }
}

/// The body of an RPC call, containing all information needed for a remote procedure call
#[derive(Clone, Debug, Default)]
pub struct call_body {
    /// RPC version, must be 2
    pub rpcvers: u32,
    /// The program to call
    pub prog: u32,
    /// The version of the program
    pub vers: u32,
    /// The procedure within the program to call
    pub proc: u32,
    /// Authentication credentials for the caller
    pub cred: Credential,
    /// Authentication verifier for the caller
    pub verf: Credential,
    /* procedure specific parameters start here */
}
DeserializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);
SerializeStruct!(call_body, rpcvers, prog, vers, proc, cred, verf);

/// The body of an RPC reply, indicating whether the call was accepted or denied
#[derive(Clone, Debug)]
pub enum reply_body {
    /// The call was accepted
    MSG_ACCEPTED(accepted_reply),
    /// The call was denied
    MSG_DENIED(rejected_reply),
}

impl Default for reply_body {
    fn default() -> reply_body {
        reply_body::MSG_ACCEPTED(accepted_reply::default())
    }
}

impl Serialize for reply_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        match self {
            reply_body::MSG_ACCEPTED(v) => {
                MSG_ACCEPTED.serialize(dest)?;
                v.serialize(dest)?;
            }
            reply_body::MSG_DENIED(v) => {
                MSG_DENIED.serialize(dest)?;
                v.serialize(dest)?;
            }
        }
        Ok(())
    }
}

impl Deserialize for reply_body {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            MSG_ACCEPTED => *self = reply_body::MSG_ACCEPTED(deserialize(src)?),
            MSG_DENIED => *self = reply_body::MSG_DENIED(deserialize(src)?),
            reply_status => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid reply status in reply_body: {reply_status}"),
                ))
            }
        }

        Ok(())
    }
}

/// Information about program version mismatch
#[derive(Clone, Debug, Default)]
pub struct mismatch_info {
    /// Lowest version supported
    pub low: u32,
    /// Highest version supported
    pub high: u32,
}
DeserializeStruct!(mismatch_info, low, high);
SerializeStruct!(mismatch_info, low, high);

/// Reply to an RPC call that was accepted by the server.
///
/// Even though the call was accepted, there could still be an error in
/// processing it: `reply_data` carries the `accept_stat` discriminant, and
/// only `SUCCESS` is followed by procedure-specific results.
#[derive(Clone, Debug, Default)]
pub struct accepted_reply {
    /// Authentication verifier from server
    pub verf: opaque_auth,
    /// Reply data union discriminated by accept_stat
    pub reply_data: accept_body,
}
DeserializeStruct!(accepted_reply, verf, reply_data);
SerializeStruct!(accepted_reply, verf, reply_data);

/// Response data for an accepted RPC call, discriminated by accept_stat.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Debug, Default)]
pub enum accept_body {
    /// Call completed successfully
    #[default]
    SUCCESS,
    /// Program is not available on this server
    PROG_UNAVAIL,
    /// Program version mismatch, includes supported version range
    PROG_MISMATCH(mismatch_info),
    /// Requested procedure is not available
    PROC_UNAVAIL,
    /// Server could not decode the call arguments
    GARBAGE_ARGS,
    /// Server ran out of memory or hit some other internal failure
    SYSTEM_ERR,
}

impl accept_body {
    /// Numeric `accept_stat`; zero means success.
    pub fn stat(&self) -> u32 {
        match self {
            accept_body::SUCCESS => 0,
            accept_body::PROG_UNAVAIL => 1,
            accept_body::PROG_MISMATCH(_) => 2,
            accept_body::PROC_UNAVAIL => 3,
            accept_body::GARBAGE_ARGS => 4,
            accept_body::SYSTEM_ERR => 5,
        }
    }
}

impl Serialize for accept_body {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.stat().serialize(dest)?;
        if let accept_body::PROG_MISMATCH(v) = self {
            v.serialize(dest)?;
        }

        Ok(())
    }
}

impl Deserialize for accept_body {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = accept_body::SUCCESS,
            1 => *self = accept_body::PROG_UNAVAIL,
            2 => *self = accept_body::PROG_MISMATCH(deserialize(src)?),
            3 => *self = accept_body::PROC_UNAVAIL,
            4 => *self = accept_body::GARBAGE_ARGS,
            5 => *self = accept_body::SYSTEM_ERR,
            accept_stat => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid accept stat in accept_body: {accept_stat}"),
                ));
            }
        }

        Ok(())
    }
}

/// Reply sent when an RPC call is rejected by the server, either because of
/// an RPC version mismatch or because authentication failed.
#[derive(Clone, Debug)]
pub enum rejected_reply {
    /// RPC version mismatch - includes supported version range
    RPC_MISMATCH(mismatch_info),
    /// Authentication failed - includes specific error code
    AUTH_ERROR(auth_stat),
}

impl rejected_reply {
    /// Numeric `reject_stat`.
    pub fn stat(&self) -> u32 {
        match self {
            rejected_reply::RPC_MISMATCH(_) => 0,
            rejected_reply::AUTH_ERROR(_) => 1,
        }
    }
}

impl Default for rejected_reply {
    fn default() -> rejected_reply {
        rejected_reply::AUTH_ERROR(auth_stat::default())
    }
}

impl Serialize for rejected_reply {
    fn serialize<W: Write>(&self, dest: &mut W) -> std::io::Result<()> {
        self.stat().serialize(dest)?;
        match self {
            rejected_reply::RPC_MISMATCH(v) => v.serialize(dest),
            rejected_reply::AUTH_ERROR(v) => v.serialize(dest),
        }
    }
}

impl Deserialize for rejected_reply {
    fn deserialize(&mut self, src: &mut &[u8]) -> std::io::Result<()> {
        match deserialize::<u32>(src)? {
            0 => *self = rejected_reply::RPC_MISMATCH(deserialize(src)?),
            1 => *self = rejected_reply::AUTH_ERROR(deserialize(src)?),
            stat => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Invalid reject stat in rejected_reply: {stat}"),
                ))
            }
        }

        Ok(())
    }
}
