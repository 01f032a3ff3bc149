//! Blocking `io::Write` adapter that feeds an async output stream

use std::io::{self, Write};
use std::mem;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::TransformError;

/// Size of the chunks handed to the response body
pub const OUTPUT_CHUNK_SIZE: usize = 64 * 1024;

/// Buffers encoder output and ships it in fixed-size chunks over a bounded
/// channel.
///
/// Must only be used from a blocking thread. When the receiving side is gone
/// every write fails with `BrokenPipe`, which makes the encoder bail out.
pub struct ChannelWriter {
    tx: mpsc::Sender<Result<Bytes, TransformError>>,
    buf: Vec<u8>,
    chunk_size: usize,
    bytes_sent: usize,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::Sender<Result<Bytes, TransformError>>) -> Self {
        Self::with_chunk_size(tx, OUTPUT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(
        tx: mpsc::Sender<Result<Bytes, TransformError>>,
        chunk_size: usize,
    ) -> Self {
        let chunk_size = chunk_size.max(1);
        ChannelWriter {
            tx,
            buf: Vec::with_capacity(chunk_size),
            chunk_size,
            bytes_sent: 0,
        }
    }

    /// Send whatever is still buffered. Returns the total bytes sent.
    pub fn finish(mut self) -> io::Result<usize> {
        self.flush()?;
        Ok(self.bytes_sent)
    }

    fn send(&mut self, chunk: Vec<u8>) -> io::Result<()> {
        let len = chunk.len();
        self.tx
            .blocking_send(Ok(Bytes::from(chunk)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "output stream closed"))?;
        self.bytes_sent += len;
        Ok(())
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.tx.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "output stream closed"));
        }

        self.buf.extend_from_slice(data);
        while self.buf.len() >= self.chunk_size {
            let rest = self.buf.split_off(self.chunk_size);
            let chunk = mem::replace(&mut self.buf, rest);
            self.send(chunk)?;
        }

        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = mem::take(&mut self.buf);
        self.send(chunk)
    }
}
