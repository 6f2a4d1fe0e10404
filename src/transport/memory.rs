//! In-memory transport
//!
//! Inbound bytes are pushed by the caller; outbound bytes are kept so they
//! can be inspected or forwarded to another node.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};

use super::{Transport, TransportResult};
use crate::protocol::{Frame, FRAME_LEN};

/// Transport backed by two in-memory buffers
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inbound: VecDeque<u8>,
    outbound: BytesMut,
    flushes: usize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make bytes available to the reader
    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes);
    }

    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Everything written since the last call
    pub fn take_written(&mut self) -> Bytes {
        self.outbound.split().freeze()
    }

    /// Written bytes cut into 12-byte frames, draining them
    pub fn take_frames(&mut self) -> Vec<Frame> {
        let written = self.take_written();
        written
            .chunks(FRAME_LEN)
            .filter_map(|chunk| Frame::from_bytes(chunk).ok())
            .collect()
    }

    /// How many times `flush` was called
    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl Transport for MemoryTransport {
    fn bytes_available(&mut self) -> usize {
        self.inbound.len()
    }

    fn peek_byte(&mut self) -> Option<u8> {
        self.inbound.front().copied()
    }

    fn read_byte(&mut self) -> Option<u8> {
        self.inbound.pop_front()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> TransportResult<()> {
        self.outbound.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> TransportResult<()> {
        self.flushes += 1;
        Ok(())
    }
}
