mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use nfs_boot::config::ClientConfig;
use nfs_boot::open::NfsRequest;
use nfs_boot::protocol::rpc::wire::read_fragment;
use nfs_boot::tcp;
use nfs_boot::xdr::{mount, nfs3, portmap};
use nfs_boot::xfer::VecSink;
use nfs_boot::Error;

use support::{lookup_ok, mount_error, mount_ok, parse_call, port_payload, read_reply_for, success};

/// How the fake server answers MNT.
#[derive(Clone, Copy)]
enum MountBehaviour {
    Allow,
    Deny,
}

/// Serves port mapper, mount and NFS on one port, exporting `/export/file.txt`.
async fn spawn_server(content: Arc<Vec<u8>>, behaviour: MountBehaviour) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let content = content.clone();
            tokio::spawn(serve_connection(socket, port, content, behaviour));
        }
    });
    port
}

async fn serve_connection(mut socket: TcpStream, port: u16, content: Arc<Vec<u8>>, behaviour: MountBehaviour) {
    while let Ok(record) = read_fragment(&mut socket).await {
        let call = parse_call(&record);
        let payload = match (call.prog, call.proc) {
            (portmap::PROGRAM, 3) => port_payload(u32::from(port)),
            (mount::PROGRAM, 1) => {
                assert_eq!(call.args::<String>(), "/export");
                match behaviour {
                    MountBehaviour::Allow => mount_ok(b"root-handle"),
                    MountBehaviour::Deny => mount_error(mount::mountstat3::MNT3ERR_ACCES),
                }
            }
            (mount::PROGRAM, 3) => vec![],
            (nfs3::PROGRAM, 3) => {
                assert_eq!(call.args::<nfs3::diropargs3>().name.as_ref(), b"file.txt");
                lookup_ok(b"file-handle")
            }
            (nfs3::PROGRAM, 6) => read_reply_for(&content, &call.args::<nfs3::file::READ3args>()),
            (prog, proc) => panic!("unexpected call {prog}/{proc}"),
        };
        if socket.write_all(&success(call.xid, &payload)).await.is_err() {
            break;
        }
    }
}

#[tokio::test]
async fn fetches_file_over_loopback() {
    let content: Arc<Vec<u8>> = Arc::new((0..5000u32).map(|i| (i * 7 % 256) as u8).collect());
    let port = spawn_server(content.clone(), MountBehaviour::Allow).await;

    let request = NfsRequest::new("127.0.0.1", "/export/file.txt").with_port(port);
    let (sink, result) = timeout(
        Duration::from_secs(10),
        tcp::fetch(request, &ClientConfig::default(), VecSink::new()),
    )
    .await
    .expect("fetch timed out");

    result.expect("fetch failed");
    assert_eq!(sink.data(), content.as_slice());
    assert_eq!(sink.size_hint(), Some(5000));
    assert_eq!(sink.close_count(), 1);
    assert!(matches!(sink.outcome(), Some(Ok(()))));
}

#[tokio::test]
async fn mount_refusal_is_reported() {
    let port = spawn_server(Arc::new(b"secret".to_vec()), MountBehaviour::Deny).await;

    let request = NfsRequest::new("127.0.0.1", "/export/file.txt").with_port(port);
    let (sink, result) = timeout(
        Duration::from_secs(10),
        tcp::fetch(request, &ClientConfig::default(), VecSink::new()),
    )
    .await
    .expect("fetch timed out");

    assert!(matches!(result, Err(Error::Mount(mount::mountstat3::MNT3ERR_ACCES))));
    assert!(sink.data().is_empty());
    assert!(matches!(sink.outcome(), Some(Err(_))));
}

#[tokio::test]
async fn connection_refused_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);

    let request = NfsRequest::new("127.0.0.1", "/export/file.txt").with_port(port);
    let (sink, result) = timeout(
        Duration::from_secs(10),
        tcp::fetch(request, &ClientConfig::default(), VecSink::new()),
    )
    .await
    .expect("fetch timed out");

    assert!(matches!(result, Err(Error::Transport(_))), "got {result:?}");
    assert_eq!(sink.close_count(), 1);
}
