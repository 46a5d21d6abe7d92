mod support;

use nfs_boot::protocol::nfs::mount::mount;
use nfs_boot::protocol::rpc::{Session, MAX_RPC_RECORD_LENGTH};
use nfs_boot::protocol::rpc::wire::{self, read_fragment};
use nfs_boot::xdr::rpc::{accept_body, Credential, MSG_DENIED};
use nfs_boot::xdr::{mount, nfs3, portmap};
use nfs_boot::Error;

use support::{denied, frame, parse_call, reply_frame, success, MockTransport, WireRef};

type TestSession = Session<MockTransport, &'static str>;

fn session(window: usize, first_xid: u32) -> (TestSession, WireRef) {
    let (transport, wire) = MockTransport::new(window);
    let session = Session::with_initial_xid(
        transport,
        portmap::PROGRAM,
        portmap::VERSION,
        Credential::system("pxe", 1000, 100),
        Credential::None,
        first_xid,
    );
    (session, wire)
}

fn sent_xids(wire: &WireRef) -> Vec<u32> {
    wire.borrow().sent.iter().map(|record| parse_call(record).xid).collect()
}

#[test]
fn call_header_round_trip() {
    let (mut session, wire) = session(4, 0x1234);
    let args = portmap::mapping { prog: mount::PROGRAM, vers: mount::VERSION, prot: portmap::IPPROTO_TCP, port: 0 };
    let xid = session.call(3, &args, "getport").unwrap();
    assert_eq!(xid, 0x1234);

    let call = parse_call(&wire.borrow().sent[0]);
    assert_eq!(call.xid, 0x1234);
    assert_eq!(call.prog, 100000);
    assert_eq!(call.vers, 2);
    assert_eq!(call.proc, 3);
    assert_eq!(call.cred, Credential::system("pxe", 1000, 100));
    assert_eq!(call.verf, Credential::None);
    assert_eq!(call.args::<portmap::mapping>(), args);
    assert_eq!(session.pending_calls(), 0);
    assert_eq!(session.pending_replies(), 1);
}

#[test]
fn record_mark_always_has_last_fragment_bit() {
    let (mut session, wire) = session(4, 1);
    session.call(6, &nfs3::file::READ3args::default(), "read").unwrap();
    let record = wire.borrow().sent[0].clone();
    let mark = u32::from_be_bytes([record[0], record[1], record[2], record[3]]);
    assert_ne!(mark & wire::LAST_FRAGMENT, 0);
    assert_eq!((mark & !wire::LAST_FRAGMENT) as usize, record.len() - 4);
}

#[test]
fn zero_window_queues_calls_in_order() {
    let (mut session, wire) = session(0, 10);
    for name in ["a", "b", "c", "d"] {
        session.call(0, &(), name).unwrap();
    }
    assert!(wire.borrow().sent.is_empty());
    assert_eq!(session.pending_calls(), 4);
    assert_eq!(session.pending_replies(), 4);

    // window for one call only: partial flush
    wire.borrow_mut().window = 1;
    assert_eq!(session.on_window_changed().unwrap(), 1);
    assert_eq!(sent_xids(&wire), vec![10]);
    assert_eq!(session.pending_calls(), 3);

    // a new call must not overtake the queued ones even with window open
    wire.borrow_mut().window = 1;
    session.call(0, &(), "e").unwrap();
    assert_eq!(sent_xids(&wire), vec![10]);
    assert_eq!(session.pending_calls(), 4);

    wire.borrow_mut().window = 0;
    assert_eq!(session.on_window_changed().unwrap(), 0);

    wire.borrow_mut().window = 2;
    assert_eq!(session.on_window_changed().unwrap(), 2);
    wire.borrow_mut().window = 10;
    assert_eq!(session.on_window_changed().unwrap(), 2);
    assert_eq!(sent_xids(&wire), vec![10, 11, 12, 13, 14]);
    assert_eq!(session.pending_calls(), 0);
    assert_eq!(session.pending_replies(), 5);
}

#[test]
fn replies_are_matched_by_xid() {
    let (mut session, _wire) = session(8, 100);
    session.call(1, "/export", "first").unwrap();
    session.call(1, "/other", "second").unwrap();

    let (cont, reply) = session.on_frame(&success(101, &[0, 0, 0, 7])).unwrap().unwrap();
    assert_eq!(cont, "second");
    assert_eq!(reply.xid, 101);
    assert_eq!(reply.payload, vec![0, 0, 0, 7]);

    let (cont, _) = session.on_frame(&success(100, &[])).unwrap().unwrap();
    assert_eq!(cont, "first");
    assert_eq!(session.pending_replies(), 0);

    // a second reply for the same xid is unknown by now
    assert!(session.on_frame(&success(100, &[])).unwrap().is_none());
}

#[test]
fn unknown_xid_is_discarded() {
    let (mut session, _wire) = session(8, 1);
    session.call(0, &(), "null").unwrap();
    assert!(session.on_frame(&success(999, &[])).unwrap().is_none());
    assert_eq!(session.pending_replies(), 1);
}

#[test]
fn failed_accept_status_still_reaches_continuation() {
    let (mut session, _wire) = session(8, 5);
    session.call(0, &(), "null").unwrap();
    let (cont, reply) = session
        .on_frame(&reply_frame(5, accept_body::PROC_UNAVAIL, &[]))
        .unwrap()
        .unwrap();
    assert_eq!(cont, "null");
    assert_eq!(reply.accept_state, 3);
    assert!(reply.check().unwrap_err().is_protocol());
}

#[test]
fn denied_reply_is_surfaced() {
    let (mut session, _wire) = session(8, 5);
    session.call(0, &(), "null").unwrap();
    let (_, reply) = session.on_frame(&denied(5)).unwrap().unwrap();
    assert_eq!(reply.reply_state, MSG_DENIED);
    assert!(reply.body().is_err());
}

#[test]
fn unset_last_fragment_bit_is_a_protocol_error() {
    let (mut session, _wire) = session(8, 5);
    session.call(0, &(), "null").unwrap();
    let mut record = success(5, &[]);
    record[0] &= 0x7F;
    assert!(session.on_frame(&record).unwrap_err().is_protocol());
}

#[test]
fn call_message_is_a_protocol_error() {
    let (mut session, _wire) = session(8, 5);
    // xid 5, msg_type CALL
    let record = frame(&[0, 0, 0, 5, 0, 0, 0, 0]);
    assert!(session.on_frame(&record).unwrap_err().is_protocol());
}

#[test]
fn truncated_reply_is_a_protocol_error() {
    let (mut session, _wire) = session(8, 5);
    session.call(0, &(), "null").unwrap();
    // xid 5, REPLY, MSG_ACCEPTED, then nothing
    let record = frame(&[0, 0, 0, 5, 0, 0, 0, 1, 0, 0, 0, 0]);
    assert!(session.on_frame(&record).unwrap_err().is_protocol());
}

#[test]
fn close_is_idempotent() {
    let (mut session, wire) = session(0, 1);
    session.call(0, &(), "queued").unwrap();
    session.close(Some(&Error::ConnectionReset));
    session.close(None);

    assert!(session.is_closed());
    assert_eq!(session.pending_calls(), 0);
    assert_eq!(session.pending_replies(), 0);
    let w = wire.borrow();
    assert_eq!(w.shutdown_calls, 1);
    assert!(matches!(&w.shutdown_reason, Some(Some(reason)) if reason.contains("closed")));
    drop(w);

    assert!(matches!(session.call(0, &(), "late"), Err(Error::ConnectionReset)));
    assert!(session.on_frame(&success(1, &[])).unwrap().is_none());
    assert_eq!(session.on_window_changed().unwrap(), 0);
}

#[test]
fn failed_delivery_registers_nothing() {
    let (mut session, wire) = session(4, 1);
    wire.borrow_mut().fail_deliver = true;
    let err = session.call(0, &(), "null").unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(session.pending_replies(), 0);
    assert_eq!(session.pending_calls(), 0);
}

#[test]
fn xid_wraps_around() {
    let (mut session, _wire) = session(8, u32::MAX);
    assert_eq!(session.call(0, &(), "a").unwrap(), u32::MAX);
    assert_eq!(session.call(0, &(), "b").unwrap(), 0);
}

#[test]
fn strings_go_out_as_raw_bytes() {
    let (mut session, wire) = session(4, 1);
    session.call(1, "/exports/café", "mnt").unwrap();
    assert_eq!(session.pending_replies(), 1);

    let call = parse_call(&wire.borrow().sent[0]);
    let raw = "/exports/café".as_bytes();
    assert_eq!(raw.len(), 14);
    assert_eq!(&call.args[..4], &14u32.to_be_bytes());
    assert_eq!(&call.args[4..18], raw);
    assert_eq!(&call.args[18..], &[0, 0]);
    assert_eq!(call.args::<String>(), "/exports/café");
}

#[test]
fn non_ascii_hostname_in_credential_is_sent() {
    let (transport, wire) = MockTransport::new(4);
    let mut session: TestSession = Session::with_initial_xid(
        transport,
        mount::PROGRAM,
        mount::VERSION,
        Credential::system("bücher", 0, 0),
        Credential::None,
        9,
    );
    session.call(1, "/export", "mnt").unwrap();
    assert_eq!(parse_call(&wire.borrow().sent[0]).cred, Credential::system("bücher", 0, 0));
}

#[test]
fn overlong_mount_path_is_rejected() {
    let (mut session, wire) = session(4, 1);
    let path = format!("/{}", "a".repeat(mount::MNTPATHLEN as usize));
    assert!(matches!(mount(&mut session, &path, "mnt"), Err(Error::InvalidRequest(_))));
    assert_eq!(session.pending_replies(), 0);
    assert!(wire.borrow().sent.is_empty());
}

#[test]
fn refused_flush_keeps_queue_order() {
    let (mut session, wire) = session(0, 10);
    session.call(0, &(), "a").unwrap();
    session.call(0, &(), "b").unwrap();
    session.call(0, &(), "c").unwrap();

    {
        let mut w = wire.borrow_mut();
        w.window = 4;
        w.refuse_next = 1;
    }
    assert_eq!(session.on_window_changed().unwrap(), 0);
    assert_eq!(session.pending_calls(), 3);
    assert_eq!(session.pending_replies(), 3);
    assert!(wire.borrow().sent.is_empty());

    assert_eq!(session.on_window_changed().unwrap(), 3);
    assert_eq!(sent_xids(&wire), vec![10, 11, 12]);
    assert_eq!(session.pending_calls(), 0);
}

#[test]
fn refusal_part_way_through_a_flush() {
    let (mut session, wire) = session(0, 20);
    for cont in ["a", "b", "c"] {
        session.call(0, &(), cont).unwrap();
    }

    wire.borrow_mut().window = 1;
    assert_eq!(session.on_window_changed().unwrap(), 1);
    {
        let mut w = wire.borrow_mut();
        w.window = 4;
        w.refuse_next = 1;
    }
    assert_eq!(session.on_window_changed().unwrap(), 0);
    assert_eq!(session.pending_calls(), 2);

    assert_eq!(session.on_window_changed().unwrap(), 2);
    assert_eq!(sent_xids(&wire), vec![20, 21, 22]);
}

#[test]
fn refused_direct_send_is_queued() {
    let (mut session, wire) = session(4, 30);
    wire.borrow_mut().refuse_next = 1;
    assert_eq!(session.call(0, &(), "a").unwrap(), 30);
    assert_eq!(session.pending_calls(), 1);
    assert_eq!(session.pending_replies(), 1);

    // queued ahead, so this one waits too
    session.call(0, &(), "b").unwrap();
    assert_eq!(session.pending_calls(), 2);
    assert!(wire.borrow().sent.is_empty());

    assert_eq!(session.on_window_changed().unwrap(), 2);
    assert_eq!(sent_xids(&wire), vec![30, 31]);
}

#[test]
fn broken_flush_is_a_transport_error() {
    let (mut session, wire) = session(0, 1);
    session.call(0, &(), "a").unwrap();
    {
        let mut w = wire.borrow_mut();
        w.window = 1;
        w.fail_deliver = true;
    }
    assert!(matches!(session.on_window_changed(), Err(Error::Transport(_))));
}

#[tokio::test]
async fn rejects_oversized_rpc_fragment() {
    let oversized = MAX_RPC_RECORD_LENGTH + 1;
    let fragment_header = (1_u32 << 31) | (oversized as u32);
    let input = fragment_header.to_be_bytes();
    let err = read_fragment(&mut &input[..]).await.expect_err("expected oversize error");
    assert!(err.to_string().contains("exceeds max"), "unexpected error: {err:?}");
}
