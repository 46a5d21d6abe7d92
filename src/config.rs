//! Client identity and tunables.

use crate::protocol::xdr::portmap::PMAP_PORT;
use crate::protocol::xdr::rpc::{auth_unix, Credential};

/// Machine name sent in AUTH_SYS credentials when none is configured.
pub const DEFAULT_HOSTNAME: &str = "nfsboot";

/// Bytes requested per READ call.
pub const DEFAULT_READ_SIZE: u32 = 1300;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Machine name for the AUTH_SYS credential, [`DEFAULT_HOSTNAME`] if unset.
    pub hostname: Option<String>,
    pub uid: u32,
    pub gid: u32,
    /// Auxiliary group ids
    pub aux_gids: Vec<u32>,
    pub read_size: u32,
    /// Port mapper port used when the request does not name one.
    pub portmap_port: u16,
    /// Bind connections to a random source port below 1024. Needs privileges,
    /// but servers exporting without `insecure` refuse anything else.
    pub privileged_source_port: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            uid: 0,
            gid: 0,
            aux_gids: Vec::new(),
            read_size: DEFAULT_READ_SIZE,
            portmap_port: PMAP_PORT,
            privileged_source_port: false,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hostname<S: AsRef<str>>(mut self, hostname: S) -> Self {
        let hostname = hostname.as_ref().trim();
        self.hostname = (!hostname.is_empty()).then(|| hostname.to_string());
        self
    }

    pub fn with_identity(mut self, uid: u32, gid: u32) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_aux_gids(mut self, gids: Vec<u32>) -> Self {
        self.aux_gids = gids;
        self
    }

    /// Zero is replaced by [`DEFAULT_READ_SIZE`].
    pub fn with_read_size(mut self, read_size: u32) -> Self {
        self.read_size = if read_size == 0 { DEFAULT_READ_SIZE } else { read_size };
        self
    }

    pub fn with_portmap_port(mut self, port: u16) -> Self {
        self.portmap_port = port;
        self
    }

    pub fn with_privileged_source_port(mut self, enabled: bool) -> Self {
        self.privileged_source_port = enabled;
        self
    }

    pub fn hostname(&self) -> &str {
        self.hostname.as_deref().unwrap_or(DEFAULT_HOSTNAME)
    }

    /// AUTH_SYS credential for this identity.
    pub fn credential(&self) -> Credential {
        Credential::System(auth_unix {
            stamp: 0,
            machinename: self.hostname().to_string(),
            uid: self.uid,
            gid: self.gid,
            gids: self.aux_gids.clone(),
        })
    }
}
