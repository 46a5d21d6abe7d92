//! The GETPORT procedure (procedure 3) of the port mapper protocol
//! as defined in RFC 1057 A.2 section.
//! https://datatracker.ietf.org/doc/rfc1057/

use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::rpc::{Reply, Session};
use crate::protocol::xdr::{deserialize, portmap};
use crate::xfer::Transport;

/// Asks the port mapper where `prog`/`vers` listens for protocol `prot`
/// (one of the `IPPROTO_*` constants).
///
/// The session must be bound to the port mapper program. Returns the
/// transaction id of the submitted call.
pub fn get_port<T: Transport, C>(
    session: &mut Session<T, C>,
    prog: u32,
    vers: u32,
    prot: u32,
    cont: C,
) -> Result<u32> {
    let args = portmap::mapping { prog, vers, prot, port: 0 };
    debug!("pmapproc_getport({:?})", args);
    session.call(portmap::PortmapProgram::PMAPPROC_GETPORT as u32, &args, cont)
}

/// Decodes a GETPORT reply into a TCP/UDP port.
///
/// A zero port means the program is not registered and is reported as an
/// error, as is a value that does not fit in 16 bits.
pub fn decode_get_port_reply(reply: &Reply) -> Result<u16> {
    let mut body = reply.body()?;
    let port = deserialize::<u32>(&mut body).map_err(Error::decode)?;
    debug!("\t{:#x} --> {:?}", reply.xid, port);
    match u16::try_from(port) {
        Ok(0) => Err(Error::protocol("program not registered with the port mapper")),
        Ok(port) => Ok(port),
        Err(_) => Err(Error::protocol(format!("port mapper returned invalid port {port}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_with(port: u32) -> Reply {
        Reply { xid: 1, payload: port.to_be_bytes().to_vec(), ..Default::default() }
    }

    #[test]
    fn decodes_port() {
        assert_eq!(decode_get_port_reply(&reply_with(635)).unwrap(), 635);
    }

    #[test]
    fn rejects_unregistered_and_oversized_ports() {
        assert!(decode_get_port_reply(&reply_with(0)).is_err());
        assert!(decode_get_port_reply(&reply_with(70000)).is_err());
    }

    #[test]
    fn rejects_short_payload() {
        let reply = Reply { xid: 1, payload: vec![0, 0], ..Default::default() };
        assert!(decode_get_port_reply(&reply).unwrap_err().is_protocol());
    }
}
