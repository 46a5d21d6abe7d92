//! Opening a file over NFS.
//!
//! [`NfsOpen`] chains three RPC services into one non-blocking pipeline:
//!
//! 1. ask the port mapper for the mount service port,
//! 2. connect to the mount service, ask the port mapper for the NFS port and
//!    mount the directory holding the file,
//! 3. connect to the NFS service and look the file up in that directory,
//! 4. read the file in fixed-size chunks and stream it into a [`DataSink`],
//! 5. unmount and report the outcome.
//!
//! Nothing here blocks. The owner feeds transport events (window changes,
//! inbound frames, closures) into the `on_*` handlers; each handler runs to
//! completion and issues whatever calls the next stage needs. Any failure
//! tears every session down and closes the sink with the error.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::nfs::{mount, portmap, v3};
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr;
use crate::protocol::xdr::nfs3::nfs_fh3;
use crate::protocol::xdr::rpc::Credential;
use crate::xfer::{Channel, Connector, DataSink};

/// What to open: a host, an optional port mapper port and an absolute path
/// of the form `/mountpoint/filename`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NfsRequest {
    pub host: String,
    /// Port mapper port; [`ClientConfig::portmap_port`] when `None`.
    pub port: Option<u16>,
    pub path: String,
}

impl NfsRequest {
    pub fn new(host: impl Into<String>, path: impl Into<String>) -> Self {
        Self { host: host.into(), port: None, path: path.into() }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }
}

/// Parses `nfs://host[:port]/path`.
impl FromStr for NfsRequest {
    type Err = Error;

    fn from_str(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("nfs://")
            .ok_or_else(|| Error::InvalidRequest(format!("{uri}: not an nfs:// URI")))?;
        let (authority, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => return Err(Error::InvalidRequest(format!("{uri}: missing path"))),
        };
        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::InvalidRequest(format!("{uri}: bad port {port:?}")))?;
                (host, Some(port))
            }
            None => (authority, None),
        };
        if host.is_empty() {
            return Err(Error::InvalidRequest(format!("{uri}: missing host")));
        }
        Ok(NfsRequest { host: host.to_string(), port, path: path.to_string() })
    }
}

impl fmt::Display for NfsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "nfs://{}:{}{}", self.host, port, self.path),
            None => write!(f, "nfs://{}{}", self.host, self.path),
        }
    }
}

/// Splits an absolute path into the directory to mount and the file name
/// inside it.
///
/// `/export/file.txt` gives `("/export", "file.txt")`, `/file.txt` gives
/// `("/", "file.txt")`.
pub fn split_path(path: &str) -> Result<(String, String)> {
    if !path.starts_with('/') {
        return Err(Error::InvalidRequest(format!("{path:?} is not an absolute path")));
    }
    let (dir, leaf) = path.rsplit_once('/').unwrap_or(("", path));
    if leaf.is_empty() {
        return Err(Error::InvalidRequest(format!("{path:?} does not name a file")));
    }
    let dir = dir.trim_end_matches('/');
    let dir = if dir.is_empty() { "/" } else { dir };
    Ok((dir.to_string(), leaf.to_string()))
}

/// Continuation attached to every call the pipeline issues.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    /// GETPORT for the mount service
    MountPort,
    /// GETPORT for the NFS service
    NfsPort,
    Mnt,
    Lookup,
    /// READ issued at `offset`
    Read { offset: u64 },
    Umnt,
}

/// Progress of an [`NfsOpen`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    Init,
    GetPortMount,
    ConnectMount,
    Mnt,
    GetPortNfs,
    ConnectNfs,
    Lookup,
    Read,
    Unmount,
    Done,
    Error,
}

/// Session type the pipeline runs over a connector's transport.
pub type ClientSession<K> = Session<<K as Connector>::Transport, Stage>;

/// One file being opened and streamed.
///
/// Owns the three sessions and the sink outright. It must be driven by a
/// single owner; see [`crate::tcp::fetch`] for a tokio driver.
pub struct NfsOpen<K: Connector, S: DataSink> {
    connector: K,
    sink: S,
    host: String,
    mountpoint: String,
    filename: String,
    credential: Credential,
    read_size: u32,
    portmap: Option<ClientSession<K>>,
    mount: Option<ClientSession<K>>,
    nfs: Option<ClientSession<K>>,
    root: Option<nfs_fh3>,
    file: Option<nfs_fh3>,
    offset: u64,
    state: State,
    outcome: Option<Result<()>>,
}

impl<K: Connector, S: DataSink> NfsOpen<K, S> {
    /// Starts opening `request`, streaming the file into `sink`.
    ///
    /// Never fails directly: if the pipeline cannot even start, the returned
    /// handle is already finished and `sink` has been closed with the error.
    pub fn open(request: NfsRequest, config: &ClientConfig, connector: K, sink: S) -> Self {
        let mut open = NfsOpen {
            connector,
            sink,
            host: request.host.clone(),
            mountpoint: String::new(),
            filename: String::new(),
            credential: config.credential(),
            read_size: config.read_size,
            portmap: None,
            mount: None,
            nfs: None,
            root: None,
            file: None,
            offset: 0,
            state: State::Init,
            outcome: None,
        };
        if let Err(e) = open.start(&request, config) {
            open.fail(e);
        }
        open
    }

    fn start(&mut self, request: &NfsRequest, config: &ClientConfig) -> Result<()> {
        let (mountpoint, filename) = split_path(&request.path)?;
        debug!("opening {} (mount {:?}, file {:?})", request, mountpoint, filename);
        self.mountpoint = mountpoint;
        self.filename = filename;

        let port = request.port.unwrap_or(config.portmap_port);
        let session = self.connect(Channel::Portmap, port)?;
        self.portmap = Some(session);

        self.enter(State::GetPortMount);
        portmap::get_port(
            self.session(Channel::Portmap)?,
            xdr::mount::PROGRAM,
            xdr::mount::VERSION,
            xdr::portmap::IPPROTO_TCP,
            Stage::MountPort,
        )?;
        Ok(())
    }

    fn connect(&mut self, channel: Channel, port: u16) -> Result<ClientSession<K>> {
        let (program, version) = match channel {
            Channel::Portmap => (xdr::portmap::PROGRAM, xdr::portmap::VERSION),
            Channel::Mount => (xdr::mount::PROGRAM, xdr::mount::VERSION),
            Channel::Nfs => (xdr::nfs3::PROGRAM, xdr::nfs3::VERSION),
        };
        debug!("connecting {:?} to {}:{}", channel, self.host, port);
        let transport = self.connector.connect(&self.host, port, channel)?;
        Ok(Session::new(transport, program, version, self.credential.clone(), Credential::None))
    }

    fn session(&mut self, channel: Channel) -> Result<&mut ClientSession<K>> {
        self.session_mut(channel)
            .ok_or_else(|| Error::protocol(format!("no {channel:?} session")))
    }

    fn session_mut(&mut self, channel: Channel) -> Option<&mut ClientSession<K>> {
        match channel {
            Channel::Portmap => self.portmap.as_mut(),
            Channel::Mount => self.mount.as_mut(),
            Channel::Nfs => self.nfs.as_mut(),
        }
    }

    fn enter(&mut self, state: State) {
        debug!("nfs open: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// The transport bound to `channel` can take more data.
    pub fn on_window_changed(&mut self, channel: Channel) {
        if self.is_finished() {
            return;
        }
        let Some(session) = self.session_mut(channel) else {
            return;
        };
        if let Err(e) = session.on_window_changed() {
            self.fail(e);
        }
    }

    /// One inbound fragment arrived on `channel`.
    pub fn on_frame(&mut self, channel: Channel, frame: &[u8]) {
        if self.is_finished() {
            return;
        }
        let Some(session) = self.session_mut(channel) else {
            warn!("frame on unopened {:?} channel", channel);
            return;
        };
        let result = match session.on_frame(frame) {
            Ok(Some((stage, reply))) => self.dispatch(stage, reply),
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            self.fail(e);
        }
    }

    /// The transport bound to `channel` went away. Closures of sessions the
    /// pipeline closed itself are expected and ignored.
    pub fn on_closed(&mut self, channel: Channel, reason: Option<Error>) {
        if self.is_finished() {
            return;
        }
        match self.session_mut(channel) {
            Some(session) if !session.is_closed() => {}
            _ => return,
        }
        let err = reason.unwrap_or(Error::ConnectionReset);
        warn!("{:?} connection closed: {}", channel, err);
        self.fail(err);
    }

    /// Aborts the transfer.
    pub fn cancel(&mut self, reason: Error) {
        if !self.is_finished() {
            self.fail(reason);
        }
    }

    fn dispatch(&mut self, stage: Stage, reply: Reply) -> Result<()> {
        match stage {
            Stage::MountPort => {
                let port = portmap::decode_get_port_reply(&reply)?;
                self.enter(State::ConnectMount);
                let session = self.connect(Channel::Mount, port)?;
                self.mount = Some(session);

                self.enter(State::GetPortNfs);
                portmap::get_port(
                    self.session(Channel::Portmap)?,
                    xdr::nfs3::PROGRAM,
                    xdr::nfs3::VERSION,
                    xdr::portmap::IPPROTO_TCP,
                    Stage::NfsPort,
                )?;

                let mountpoint = self.mountpoint.clone();
                mount::mount(self.session(Channel::Mount)?, &mountpoint, Stage::Mnt)?;
            }
            Stage::NfsPort => {
                let port = portmap::decode_get_port_reply(&reply)?;
                self.enter(State::ConnectNfs);
                let session = self.connect(Channel::Nfs, port)?;
                self.nfs = Some(session);
                if let Some(portmap) = self.portmap.as_mut() {
                    portmap.close(None);
                }
                self.enter(if self.root.is_some() { State::Lookup } else { State::Mnt });
                self.lookup_when_ready()?;
            }
            Stage::Mnt => {
                let root = mount::decode_mount_reply(&reply)?;
                self.root = Some(root);
                if self.nfs.is_some() {
                    self.enter(State::Lookup);
                }
                self.lookup_when_ready()?;
            }
            Stage::Lookup => {
                let file = v3::decode_lookup_reply(&reply)?;
                self.enter(State::Read);
                self.offset = 0;
                self.file = Some(file);
                self.read_next()?;
            }
            Stage::Read { offset } => self.on_read(offset, &reply)?,
            Stage::Umnt => {
                mount::decode_unmount_reply(&reply)?;
                self.finish();
            }
        }
        Ok(())
    }

    /// Issues the lookup once both the root handle and the NFS session exist,
    /// whichever came last.
    fn lookup_when_ready(&mut self) -> Result<()> {
        let Some(root) = self.root.clone() else {
            return Ok(());
        };
        let filename = self.filename.clone();
        let Some(nfs) = self.nfs.as_mut() else {
            return Ok(());
        };
        v3::lookup(nfs, &root, &filename, Stage::Lookup)?;
        Ok(())
    }

    fn read_next(&mut self) -> Result<()> {
        let offset = self.offset;
        let count = self.read_size;
        let file = self.file.clone().ok_or_else(|| Error::protocol("read without a file handle"))?;
        v3::read(self.session(Channel::Nfs)?, &file, offset, count, Stage::Read { offset })?;
        Ok(())
    }

    fn on_read(&mut self, offset: u64, reply: &Reply) -> Result<()> {
        let read = v3::decode_read_reply(reply)?;
        if offset == 0 {
            self.sink.seek(read.file_size);
            self.sink.seek(0);
        }
        if read.count == 0 && !read.eof {
            return Err(Error::protocol(format!("empty READ at offset {offset} before EOF")));
        }
        self.offset = offset + u64::from(read.count);
        if !read.data.is_empty() {
            self.sink.deliver(&read.data)?;
        }

        if !read.eof {
            return self.read_next();
        }

        debug!("EOF after {} bytes", self.offset);
        if let Some(nfs) = self.nfs.as_mut() {
            nfs.close(None);
        }
        self.enter(State::Unmount);
        let mountpoint = self.mountpoint.clone();
        mount::unmount(self.session(Channel::Mount)?, &mountpoint, Stage::Umnt)?;
        Ok(())
    }

    fn finish(&mut self) {
        info!("fetched {}:{}/{} ({} bytes)", self.host, self.mountpoint, self.filename, self.offset);
        self.teardown(Ok(()));
    }

    fn fail(&mut self, err: Error) {
        error!("nfs open failed in {:?}: {}", self.state, err);
        self.teardown(Err(err));
    }

    /// Closes every session and the sink. Runs once; later calls are no-ops.
    fn teardown(&mut self, result: Result<()>) {
        if self.outcome.is_some() {
            return;
        }
        self.state = if result.is_ok() { State::Done } else { State::Error };
        let reason = result.as_ref().err();
        for session in [&mut self.portmap, &mut self.mount, &mut self.nfs].into_iter().flatten() {
            session.close(reason);
        }
        self.sink.close(result.as_ref().map(|_| ()));
        self.outcome = Some(result);
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// `None` while the transfer is running.
    pub fn outcome(&self) -> Option<&Result<()>> {
        self.outcome.as_ref()
    }

    pub fn mountpoint(&self) -> &str {
        &self.mountpoint
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Bytes delivered to the sink so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn session_for(&self, channel: Channel) -> Option<&ClientSession<K>> {
        match channel {
            Channel::Portmap => self.portmap.as_ref(),
            Channel::Mount => self.mount.as_ref(),
            Channel::Nfs => self.nfs.as_ref(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn connector(&self) -> &K {
        &self.connector
    }

    /// Gives the sink back together with the outcome, `None` if the transfer
    /// had not finished.
    pub fn into_outcome(self) -> (S, Option<Result<()>>) {
        (self.sink, self.outcome)
    }
}
