use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use nfs_boot::config::ClientConfig;
use nfs_boot::open::NfsRequest;
use nfs_boot::tcp;
use nfs_boot::xfer::VecSink;

const USAGE: &str = "Usage: nfsget [OPTIONS] nfs://HOST[:PORTMAP_PORT]/MOUNTPOINT/FILE\n\
     \n\
     Options:\n\
       -o, --output FILE           Write the file here instead of stdout\n\
       --hostname NAME             Machine name sent in AUTH_SYS credentials\n\
       --uid UID                   User id sent in AUTH_SYS credentials (default: 0)\n\
       --gid GID                   Group id sent in AUTH_SYS credentials (default: 0)\n\
       --read-size BYTES           Bytes per READ call (default: 1300)\n\
       --privileged-source-port    Connect from a source port below 1024\n\
       -h, --help                  Show this help and exit";

/// Fetches one file over NFS and writes it to stdout or to a file.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(std::io::stderr)
        .init();

    let mut config = ClientConfig::new();
    let mut output: Option<PathBuf> = None;
    let mut uri: Option<String> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-o" | "--output" => {
                output = Some(PathBuf::from(args.next().context("--output needs a value")?));
            }
            "--hostname" => {
                config = config.with_hostname(args.next().context("--hostname needs a value")?);
            }
            "--uid" => {
                let uid = args.next().context("--uid needs a value")?.parse()?;
                let gid = config.gid;
                config = config.with_identity(uid, gid);
            }
            "--gid" => {
                let gid = args.next().context("--gid needs a value")?.parse()?;
                let uid = config.uid;
                config = config.with_identity(uid, gid);
            }
            "--read-size" => {
                let size = args.next().context("--read-size needs a value")?.parse()?;
                config = config.with_read_size(size);
            }
            "--privileged-source-port" => {
                config = config.with_privileged_source_port(true);
            }
            "--help" | "-h" => {
                eprintln!("{USAGE}");
                return Ok(());
            }
            _ if arg.starts_with('-') => {
                eprintln!("Unknown flag: {arg}");
                eprintln!("Run with --help for usage.");
                std::process::exit(2);
            }
            _ => {
                if uri.is_some() {
                    eprintln!("Unexpected extra argument: {arg}");
                    eprintln!("Run with --help for usage.");
                    std::process::exit(2);
                }
                uri = Some(arg);
            }
        }
    }

    let Some(uri) = uri else {
        bail!("must supply an nfs:// URI\n{USAGE}");
    };
    let request: NfsRequest = uri.parse()?;
    let (sink, result) = tcp::fetch(request, &config, VecSink::new()).await;
    result.with_context(|| format!("fetching {uri}"))?;

    match output {
        Some(path) => std::fs::write(&path, sink.data())
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(sink.data())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
