//! PORTMAP protocol client as specified in RFC 1833 (previously RFC 1057 Appendix A).
//! https://datatracker.ietf.org/doc/rfc1833/

mod get_port;

pub use get_port::{decode_get_port_reply, get_port};
