//! Data-transfer interfaces the RPC sessions and the NFS-open pipeline plug
//! into.
//!
//! - [`Transport`]: one duplex byte-stream binding (a TCP connection in
//!   practice) as seen by an RPC session.
//! - [`Connector`]: opens new transport bindings on demand.
//! - [`DataSink`]: the consumer that receives the bytes of an opened file.
//!
//! Inbound frames, window changes and closures are not pulled through these
//! traits; the event loop that owns the bindings pushes them into the
//! pipeline's event handlers, tagged with the [`Channel`] they arrived on.

use std::io;

use crate::error::{Error, Result};

/// Which of the pipeline's connections an event belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Port mapper (program 100000)
    Portmap,
    /// Mount service (program 100005)
    Mount,
    /// File service (program 100003)
    Nfs,
}

/// One outbound byte-stream binding.
pub trait Transport {
    /// Current flow-control window. Zero means sends must be deferred until
    /// the binding announces a window change.
    fn window(&self) -> usize;

    /// Hands one complete record to the binding.
    ///
    /// A binding without room refuses the record and hands it back with
    /// [`DeliverError::Refused`].
    fn deliver(&mut self, data: Vec<u8>) -> std::result::Result<(), DeliverError>;

    /// Closes the binding. `None` is a clean close.
    fn shutdown(&mut self, reason: Option<&Error>);
}

/// Why a binding did not take a record.
#[derive(Debug)]
pub enum DeliverError {
    /// No room right now. The record is returned untouched.
    Refused(Vec<u8>),
    /// The binding is unusable.
    Broken(io::Error),
}

/// Opens transport bindings.
///
/// `connect` must not block: a binding that is still connecting simply
/// reports a zero window until it is ready.
pub trait Connector {
    type Transport: Transport;

    fn connect(&mut self, host: &str, port: u16, channel: Channel) -> Result<Self::Transport>;
}

/// Consumer side of an opened file.
pub trait DataSink {
    /// Moves the write position. The producer reports the total size by
    /// seeking to it once and then rewinds to zero before any data arrives.
    fn seek(&mut self, position: u64);

    /// Appends bytes at the current position.
    fn deliver(&mut self, data: &[u8]) -> Result<()>;

    /// Final notification, invoked exactly once.
    fn close(&mut self, result: std::result::Result<(), &Error>);
}

/// In-memory [`DataSink`] that collects the whole file.
#[derive(Debug, Default)]
pub struct VecSink {
    data: Vec<u8>,
    position: usize,
    size_hint: Option<u64>,
    outcome: Option<std::result::Result<(), String>>,
    closes: usize,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Largest position the producer seeked to, i.e. the announced size.
    pub fn size_hint(&self) -> Option<u64> {
        self.size_hint
    }

    /// `None` until closed; the error is kept as its display string.
    pub fn outcome(&self) -> Option<&std::result::Result<(), String>> {
        self.outcome.as_ref()
    }

    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl DataSink for VecSink {
    fn seek(&mut self, position: u64) {
        let position = usize::try_from(position).unwrap_or(usize::MAX);
        if position > self.data.len() {
            self.size_hint = Some(position as u64);
            // Preallocation is only an optimisation.
            let _ = self.data.try_reserve(position - self.data.len());
        }
        self.position = position;
    }

    fn deliver(&mut self, data: &[u8]) -> Result<()> {
        let end = self.position.checked_add(data.len()).ok_or(Error::OutOfMemory)?;
        if end > self.data.len() {
            self.data.try_reserve(end - self.data.len())?;
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(data);
        self.position = end;
        Ok(())
    }

    fn close(&mut self, result: std::result::Result<(), &Error>) {
        self.closes += 1;
        self.outcome = Some(result.map_err(|e| e.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_honours_size_then_rewind() {
        let mut sink = VecSink::new();
        sink.seek(6);
        sink.seek(0);
        sink.deliver(b"abc").unwrap();
        sink.deliver(b"def").unwrap();
        assert_eq!(sink.data(), b"abcdef");
        assert_eq!(sink.size_hint(), Some(6));
    }

    #[test]
    fn vec_sink_records_close() {
        let mut sink = VecSink::new();
        sink.close(Err(&Error::ConnectionReset));
        assert_eq!(sink.close_count(), 1);
        assert!(matches!(sink.outcome(), Some(Err(_))));
    }
}
