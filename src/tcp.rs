//! The TCP module drives an [`NfsOpen`] over real TCP connections with tokio.
//!
//! Every connection gets its own task for socket I/O. The tasks never touch
//! the pipeline: they turn what happens on the socket into [`Event`]s and
//! push them into one channel. [`fetch`] is the only consumer of that
//! channel and the only owner of the pipeline, so event handlers run one at a
//! time and need no locking.

use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::open::{NfsOpen, NfsRequest};
use crate::protocol::rpc::wire;
use crate::xfer::{Channel, Connector, DataSink, DeliverError, Transport};

/// Records a connection may buffer before its window drops to zero.
const OUTBOUND_RECORDS: usize = 8;

/// Reserved ports tried when binding a privileged source port.
const RESERVED_PORTS: std::ops::Range<u16> = 512..1024;

/// What a connection task reports to the event loop.
#[derive(Debug)]
pub enum Event {
    /// The connection can take more records.
    Window(Channel),
    /// One record-marked fragment, mark included.
    Frame(Channel, Vec<u8>),
    /// The connection is gone. `None` means the peer closed it cleanly.
    Closed(Channel, Option<io::Error>),
}

/// Opens [`TcpTransport`]s. Must be used from within a tokio runtime.
pub struct TcpConnector {
    events: mpsc::UnboundedSender<Event>,
    privileged_source_port: bool,
}

impl TcpConnector {
    pub fn new(events: mpsc::UnboundedSender<Event>, privileged_source_port: bool) -> Self {
        Self { events, privileged_source_port }
    }
}

impl Connector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&mut self, host: &str, port: u16, channel: Channel) -> Result<TcpTransport> {
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_RECORDS);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let connected = Arc::new(AtomicBool::new(false));

        let connection = Connection {
            host: host.to_string(),
            port,
            channel,
            privileged_source_port: self.privileged_source_port,
            connected: connected.clone(),
            events: self.events.clone(),
        };
        tokio::spawn(connection.run(outbound_rx, shutdown_rx));

        Ok(TcpTransport { channel, outbound, connected, shutdown: Some(shutdown) })
    }
}

/// Session-side handle of one TCP connection.
///
/// The window is zero until the connection is established and afterwards
/// counts the free slots of the outbound buffer.
pub struct TcpTransport {
    channel: Channel,
    outbound: mpsc::Sender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl Transport for TcpTransport {
    fn window(&self) -> usize {
        if self.shutdown.is_none() || !self.connected.load(Ordering::Acquire) {
            return 0;
        }
        self.outbound.capacity()
    }

    fn deliver(&mut self, data: Vec<u8>) -> std::result::Result<(), DeliverError> {
        self.outbound.try_send(data).map_err(|e| match e {
            mpsc::error::TrySendError::Full(data) => DeliverError::Refused(data),
            mpsc::error::TrySendError::Closed(_) => {
                DeliverError::Broken(io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"))
            }
        })
    }

    fn shutdown(&mut self, reason: Option<&Error>) {
        if let Some(shutdown) = self.shutdown.take() {
            match reason {
                Some(reason) => debug!("shutting down {:?} connection: {}", self.channel, reason),
                None => debug!("shutting down {:?} connection", self.channel),
            }
            let _ = shutdown.send(());
        }
    }
}

struct Connection {
    host: String,
    port: u16,
    channel: Channel,
    privileged_source_port: bool,
    connected: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<Event>,
}

impl Connection {
    async fn run(self, outbound: mpsc::Receiver<Vec<u8>>, shutdown: oneshot::Receiver<()>) {
        let channel = self.channel;
        let events = self.events.clone();
        if let Err(e) = self.process(outbound, shutdown).await {
            debug!("{:?} connection failed: {:?}", channel, e);
            let _ = events.send(Event::Closed(channel, Some(e)));
        }
    }

    async fn process(
        self,
        mut outbound: mpsc::Receiver<Vec<u8>>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> io::Result<()> {
        let stream = tokio::select! {
            _ = &mut shutdown => return Ok(()),
            stream = open_stream(&self.host, self.port, self.privileged_source_port) => stream?,
        };
        info!("{:?} connected to {}:{}", self.channel, self.host, self.port);
        let (mut reader, mut writer) = stream.into_split();
        self.connected.store(true, Ordering::Release);
        let _ = self.events.send(Event::Window(self.channel));

        let channel = self.channel;
        let reader_events = self.events.clone();
        let reader_task = tokio::spawn(async move {
            loop {
                match wire::read_fragment(&mut reader).await {
                    Ok(frame) => {
                        trace!("{:?} received {} byte fragment", channel, frame.len());
                        if reader_events.send(Event::Frame(channel, frame)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        let reason = match e.downcast::<io::Error>() {
                            Ok(e) if e.kind() == io::ErrorKind::UnexpectedEof => None,
                            Ok(e) => Some(e),
                            Err(e) => Some(io::Error::new(io::ErrorKind::InvalidData, e.to_string())),
                        };
                        debug!("{:?} read loop ended: {:?}", channel, reason);
                        let _ = reader_events.send(Event::Closed(channel, reason));
                        break;
                    }
                }
            }
        });

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => break Ok(()),
                record = outbound.recv() => {
                    let Some(record) = record else {
                        break Ok(());
                    };
                    trace!("{:?} writing {} bytes", self.channel, record.len());
                    if let Err(e) = writer.write_all(&record).await {
                        break Err(e);
                    }
                    let _ = self.events.send(Event::Window(self.channel));
                }
            }
        };

        reader_task.abort();
        let _ = writer.shutdown().await;
        result
    }
}

async fn open_stream(host: &str, port: u16, privileged: bool) -> io::Result<TcpStream> {
    let mut last_err = None;
    for addr in lookup_host((host, port)).await? {
        match connect_addr(addr, privileged).await {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                warn!("connect to {} failed: {}", addr, e);
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, format!("{host}: no addresses"))
    }))
}

async fn connect_addr(addr: SocketAddr, privileged: bool) -> io::Result<TcpStream> {
    let socket = if addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    if privileged {
        bind_reserved_port(&socket, addr)?;
    }
    let stream = socket.connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Binds `socket` to a free port below 1024, starting at a random one.
fn bind_reserved_port(socket: &TcpSocket, peer: SocketAddr) -> io::Result<()> {
    let ip = match peer {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    let span = RESERVED_PORTS.end - RESERVED_PORTS.start;
    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u16(peer.port());
    let start = (hasher.finish() % u64::from(span)) as u16;

    let mut last_err = None;
    for i in 0..span {
        let port = RESERVED_PORTS.start + (start + i) % span;
        match socket.bind(SocketAddr::new(ip, port)) {
            Ok(()) => {
                debug!("bound source port {}", port);
                return Ok(());
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => last_err = Some(e),
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrInUse)))
}

/// Fetches the file named by `request` into `sink`.
///
/// Returns the sink along with the outcome; the sink has already been closed
/// with that outcome.
pub async fn fetch<S: DataSink>(request: NfsRequest, config: &ClientConfig, sink: S) -> (S, Result<()>) {
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let connector = TcpConnector::new(events_tx, config.privileged_source_port);
    let mut open = NfsOpen::open(request, config, connector, sink);

    while !open.is_finished() {
        match events.recv().await {
            Some(Event::Window(channel)) => open.on_window_changed(channel),
            Some(Event::Frame(channel, frame)) => open.on_frame(channel, &frame),
            Some(Event::Closed(channel, reason)) => open.on_closed(channel, reason.map(Error::Transport)),
            None => open.cancel(Error::ConnectionReset),
        }
    }

    let (sink, outcome) = open.into_outcome();
    (sink, outcome.unwrap_or(Err(Error::ConnectionReset)))
}
