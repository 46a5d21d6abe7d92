#![allow(dead_code)]

use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use nfs_boot::protocol::rpc::wire;
use nfs_boot::xdr::rpc::{
    accept_body, accepted_reply, opaque_auth, rejected_reply, reply_body, rpc_body, rpc_msg, Credential,
};
use nfs_boot::xdr::{deserialize, mount, nfs3, to_vec, Deserialize, Serialize};
use nfs_boot::xfer::{Channel, Connector, DataSink, DeliverError, Transport};
use nfs_boot::{Error, Result};

/// Client-visible state of one mock connection, shared with the test.
#[derive(Debug, Default)]
pub struct Wire {
    pub host: String,
    pub port: u16,
    pub channel: Option<Channel>,
    /// Records handed to the transport, oldest first
    pub sent: Vec<Vec<u8>>,
    /// Records the transport accepts before the window closes
    pub window: usize,
    pub fail_deliver: bool,
    /// Deliveries to refuse before accepting again, whatever the window says
    pub refuse_next: usize,
    pub shutdown_calls: usize,
    /// Reason passed to the first shutdown, `Some(None)` for a clean close
    pub shutdown_reason: Option<Option<String>>,
}

pub type WireRef = Rc<RefCell<Wire>>;

pub struct MockTransport(pub WireRef);

impl MockTransport {
    pub fn new(window: usize) -> (Self, WireRef) {
        let wire = Rc::new(RefCell::new(Wire { window, ..Default::default() }));
        (MockTransport(wire.clone()), wire)
    }
}

impl Transport for MockTransport {
    fn window(&self) -> usize {
        self.0.borrow().window
    }

    fn deliver(&mut self, data: Vec<u8>) -> std::result::Result<(), DeliverError> {
        let mut wire = self.0.borrow_mut();
        if wire.fail_deliver {
            return Err(DeliverError::Broken(io::Error::new(io::ErrorKind::BrokenPipe, "mock transport broken")));
        }
        if wire.refuse_next > 0 {
            wire.refuse_next -= 1;
            return Err(DeliverError::Refused(data));
        }
        wire.window = wire.window.saturating_sub(1);
        wire.sent.push(data);
        Ok(())
    }

    fn shutdown(&mut self, reason: Option<&Error>) {
        let mut wire = self.0.borrow_mut();
        wire.shutdown_calls += 1;
        if wire.shutdown_reason.is_none() {
            wire.shutdown_reason = Some(reason.map(|e| e.to_string()));
        }
    }
}

/// Hands out [`MockTransport`]s and keeps every wire for inspection.
#[derive(Clone, Default)]
pub struct MockConnector {
    pub wires: Rc<RefCell<Vec<WireRef>>>,
    pub initial_window: usize,
    pub refuse: Option<Channel>,
}

impl MockConnector {
    pub fn with_window(initial_window: usize) -> Self {
        MockConnector { initial_window, ..Default::default() }
    }

    /// Most recent connection opened for `channel`.
    pub fn wire(&self, channel: Channel) -> WireRef {
        self.find(channel).unwrap_or_else(|| panic!("no {channel:?} connection"))
    }

    pub fn find(&self, channel: Channel) -> Option<WireRef> {
        self.wires.borrow().iter().rev().find(|w| w.borrow().channel == Some(channel)).cloned()
    }

    pub fn connection_count(&self) -> usize {
        self.wires.borrow().len()
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&mut self, host: &str, port: u16, channel: Channel) -> Result<MockTransport> {
        if self.refuse == Some(channel) {
            return Err(Error::Transport(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")));
        }
        let (transport, wire) = MockTransport::new(self.initial_window);
        {
            let mut w = wire.borrow_mut();
            w.host = host.to_string();
            w.port = port;
            w.channel = Some(channel);
        }
        self.wires.borrow_mut().push(wire);
        Ok(transport)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Seek(u64),
    Data(Vec<u8>),
    Close(std::result::Result<(), String>),
}

/// Sink that remembers every call in order.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<SinkEvent>,
}

impl RecordingSink {
    pub fn data(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Data(d) => Some(d.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn closes(&self) -> Vec<&std::result::Result<(), String>> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Close(r) => Some(r),
                _ => None,
            })
            .collect()
    }
}

impl DataSink for RecordingSink {
    fn seek(&mut self, position: u64) {
        self.events.push(SinkEvent::Seek(position));
    }

    fn deliver(&mut self, data: &[u8]) -> Result<()> {
        self.events.push(SinkEvent::Data(data.to_vec()));
        Ok(())
    }

    fn close(&mut self, result: std::result::Result<(), &Error>) {
        self.events.push(SinkEvent::Close(result.map_err(|e| e.to_string())));
    }
}

/// A call as the server sees it.
#[derive(Debug)]
pub struct Call {
    pub xid: u32,
    pub prog: u32,
    pub vers: u32,
    pub proc: u32,
    pub cred: Credential,
    pub verf: Credential,
    pub args: Vec<u8>,
}

impl Call {
    pub fn args<T: Deserialize + Default>(&self) -> T {
        let mut src = self.args.as_slice();
        let value = deserialize::<T>(&mut src).expect("cannot decode call arguments");
        assert!(src.is_empty(), "trailing bytes after call arguments");
        value
    }
}

/// Decodes one record written by a session.
pub fn parse_call(record: &[u8]) -> Call {
    let mut body = wire::fragment_body(record).expect("call must be a single final fragment");
    let msg = deserialize::<rpc_msg>(&mut body).expect("cannot decode call header");
    let rpc_body::CALL(call) = msg.body else {
        panic!("expected a call, got {:?}", msg.body);
    };
    assert_eq!(call.rpcvers, 2);
    Call {
        xid: msg.xid,
        prog: call.prog,
        vers: call.vers,
        proc: call.proc,
        cred: call.cred,
        verf: call.verf,
        args: body.to_vec(),
    }
}

/// Pops the oldest record sent on `wire` and decodes it.
pub fn take_call(wire: &WireRef) -> Call {
    let record = {
        let mut w = wire.borrow_mut();
        assert!(!w.sent.is_empty(), "nothing sent on {:?}", w.channel);
        w.sent.remove(0)
    };
    parse_call(&record)
}

/// Prefixes `body` with a final-fragment record mark.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() as u32) | (1 << 31)).to_be_bytes().to_vec();
    out.extend_from_slice(body);
    out
}

pub fn accepted(xid: u32, reply_data: accept_body) -> rpc_msg {
    let reply = reply_body::MSG_ACCEPTED(accepted_reply { verf: opaque_auth::default(), reply_data });
    rpc_msg { xid, body: rpc_body::REPLY(reply) }
}

pub fn reply_frame(xid: u32, accept: accept_body, payload: &[u8]) -> Vec<u8> {
    let mut body = to_vec(&accepted(xid, accept)).unwrap();
    body.extend_from_slice(payload);
    frame(&body)
}

pub fn success(xid: u32, payload: &[u8]) -> Vec<u8> {
    reply_frame(xid, accept_body::SUCCESS, payload)
}

pub fn denied(xid: u32) -> Vec<u8> {
    let msg = rpc_msg {
        xid,
        body: rpc_body::REPLY(reply_body::MSG_DENIED(rejected_reply::default())),
    };
    frame(&to_vec(&msg).unwrap())
}

pub fn port_payload(port: u32) -> Vec<u8> {
    to_vec(&port).unwrap()
}

pub fn mount_ok(fh: &[u8]) -> Vec<u8> {
    let mut out = to_vec(&mount::mountstat3::MNT3_OK).unwrap();
    mount::mountres3_ok { fhandle: fh.to_vec(), auth_flavors: vec![0, 1] }
        .serialize(&mut out)
        .unwrap();
    out
}

pub fn mount_error(stat: mount::mountstat3) -> Vec<u8> {
    to_vec(&stat).unwrap()
}

pub fn lookup_ok(fh: &[u8]) -> Vec<u8> {
    let mut out = to_vec(&nfs3::nfsstat3::NFS3_OK).unwrap();
    nfs3::dir::LOOKUP3resok {
        object: fh.to_vec().into(),
        obj_attributes: nfs3::post_op_attr::Void,
        dir_attributes: nfs3::post_op_attr::Void,
    }
    .serialize(&mut out)
    .unwrap();
    out
}

pub fn nfs_error(stat: nfs3::nfsstat3) -> Vec<u8> {
    let mut out = to_vec(&stat).unwrap();
    nfs3::post_op_attr::Void.serialize(&mut out).unwrap();
    out
}

pub fn read_ok(size: Option<u64>, data: &[u8], eof: bool) -> Vec<u8> {
    let file_attributes = match size {
        Some(size) => nfs3::post_op_attr::attributes(nfs3::fattr3 { size, ..Default::default() }),
        None => nfs3::post_op_attr::Void,
    };
    let mut out = to_vec(&nfs3::nfsstat3::NFS3_OK).unwrap();
    nfs3::file::READ3resok { file_attributes, count: data.len() as u32, eof, data: data.to_vec() }
        .serialize(&mut out)
        .unwrap();
    out
}

/// Answers a READ of `content` the way a server would.
pub fn read_reply_for(content: &[u8], args: &nfs3::file::READ3args) -> Vec<u8> {
    let start = (args.offset as usize).min(content.len());
    let end = (start + args.count as usize).min(content.len());
    read_ok(Some(content.len() as u64), &content[start..end], end == content.len())
}
