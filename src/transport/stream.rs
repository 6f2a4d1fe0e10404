//! Channel-fed stream transport
//!
//! Bytes read elsewhere (typically by an async reader task on a serial
//! device or stdin) arrive through an mpsc channel and are buffered until
//! the engine polls for them. Output goes straight to a `Write`.

use std::collections::VecDeque;
use std::io::Write;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::{Transport, TransportResult};
use crate::protocol::FRAME_LEN;

/// Transport over a byte channel and a writer
pub struct StreamTransport<W: Write> {
    /// Chunks delivered by the reader task
    source: mpsc::UnboundedReceiver<Bytes>,
    /// Bytes received but not yet consumed
    buffer: VecDeque<u8>,
    /// Output side of the link
    writer: W,
    /// The reader task has gone away
    closed: bool,
}

impl<W: Write> StreamTransport<W> {
    pub fn new(source: mpsc::UnboundedReceiver<Bytes>, writer: W) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            writer,
            closed: false,
        }
    }

    /// Move every chunk waiting in the channel into the read buffer
    fn pump(&mut self) {
        loop {
            match self.source.try_recv() {
                Ok(chunk) => self.buffer.extend(chunk.iter()),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.closed {
                        tracing::debug!("Transport input closed");
                    }
                    self.closed = true;
                    break;
                }
            }
        }
    }

    /// True once the input has ended and what is left cannot form a frame
    pub fn is_exhausted(&mut self) -> bool {
        self.pump();
        self.closed && self.buffer.len() < FRAME_LEN
    }
}

impl<W: Write> Transport for StreamTransport<W> {
    fn bytes_available(&mut self) -> usize {
        self.pump();
        self.buffer.len()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        if self.buffer.is_empty() {
            self.pump();
        }
        self.buffer.front().copied()
    }

    fn read_byte(&mut self) -> Option<u8> {
        if self.buffer.is_empty() {
            self.pump();
        }
        self.buffer.pop_front()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> TransportResult<()> {
        self.writer.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_channel_chunks() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut transport = StreamTransport::new(rx, Vec::new());

        tx.send(Bytes::from_static(b"aBC")).unwrap();
        tx.send(Bytes::from_static(b"HELLO----")).unwrap();

        assert_eq!(transport.bytes_available(), 12);
        assert_eq!(transport.read_byte(), Some(b'a'));
        assert!(!transport.is_exhausted());
    }

    #[test]
    fn test_exhausted_after_sender_dropped() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut transport = StreamTransport::new(rx, Vec::new());

        tx.send(Bytes::from_static(b"aBCHELLO----a")).unwrap();
        drop(tx);

        assert!(!transport.is_exhausted());
        for _ in 0..12 {
            transport.read_byte();
        }
        // A lone trailing byte can never become a frame
        assert!(transport.is_exhausted());
    }

    #[test]
    fn test_writes_to_writer() {
        let (_tx, rx) = mpsc::unbounded_channel::<Bytes>();
        let mut transport = StreamTransport::new(rx, Vec::new());

        transport.write_bytes(b"a..HELLO----").unwrap();
        transport.flush().unwrap();
        assert_eq!(transport.writer, b"a..HELLO----".to_vec());
    }
}
