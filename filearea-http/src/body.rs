use std::io::{self, Write};

use axum::body::{Body, Bytes};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Chunks in flight between the streaming thread and the response body.
const CHANNEL_DEPTH: usize = 4;

/// Blocking `Write` end of a response body. Once the body is dropped (client gone)
/// every write fails with `BrokenPipe`.
pub struct ChannelWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl ChannelWriter {
    /// Fail the response mid-body so the client sees a broken transfer, not a short one.
    pub fn abort(&self, reason: String) {
        let _ = self.tx.blocking_send(Err(io::Error::other(reason)));
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .blocking_send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn channel_body() -> (ChannelWriter, Body) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    (ChannelWriter { tx }, Body::from_stream(ReceiverStream::new(rx)))
}
