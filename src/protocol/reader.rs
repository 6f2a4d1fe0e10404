//! Frame synchronization
//!
//! Pulls bytes off a transport and assembles 12-byte frames. The marker
//! byte is the only synchronization point: seeing it again before a frame
//! is complete means the stream slipped, so the partial frame is thrown
//! away and the new marker starts the next one.

use super::{Frame, FRAME_LEN, FRAME_MARKER};
use crate::transport::Transport;

/// Reader state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderState {
    /// Looking for a frame marker
    #[default]
    Idle,
    /// Marker seen, filling the frame buffer
    Collecting,
}

/// Counters kept by the reader
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderStats {
    /// Complete frames emitted
    pub frames: u64,
    /// Partial frames abandoned on an embedded marker
    pub desyncs: u64,
    /// Bytes dropped while looking for a marker
    pub discarded: u64,
}

/// Incremental frame reader
#[derive(Debug, Default)]
pub struct FrameReader {
    state: ReaderState,
    buf: [u8; FRAME_LEN],
    len: usize,
    stats: ReaderStats,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn stats(&self) -> ReaderStats {
        self.stats
    }

    /// Try to pull one frame off the transport.
    ///
    /// Nothing is consumed unless a whole frame's worth of bytes is already
    /// buffered, so this never waits on the link; call it again on the next
    /// tick. Returns `None` when no complete frame could be captured.
    pub fn poll<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<Frame> {
        while transport.bytes_available() >= FRAME_LEN {
            match self.state {
                ReaderState::Idle => match transport.peek_byte() {
                    Some(FRAME_MARKER) => {
                        self.state = ReaderState::Collecting;
                        self.len = 0;
                    }
                    Some(_) => {
                        transport.read_byte();
                        self.stats.discarded += 1;
                    }
                    None => return None,
                },
                ReaderState::Collecting => return self.collect(transport),
            }
        }
        None
    }

    fn collect<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Option<Frame> {
        while self.len < FRAME_LEN {
            let Some(byte) = transport.read_byte() else {
                self.reset();
                return None;
            };
            self.buf[self.len] = byte;
            self.len += 1;

            if self.len < FRAME_LEN && transport.peek_byte() == Some(FRAME_MARKER) {
                tracing::debug!(
                    "Frame desync after {} bytes, dropping {:?}",
                    self.len,
                    String::from_utf8_lossy(&self.buf[..self.len])
                );
                self.stats.desyncs += 1;
                self.reset();
                return None;
            }
        }

        let frame = Frame::from_bytes(&self.buf).ok();
        self.reset();
        if frame.is_some() {
            self.stats.frames += 1;
        }
        frame
    }

    fn reset(&mut self) {
        self.state = ReaderState::Idle;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;

    #[test]
    fn test_reads_single_frame() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"aBCTEMP21---");
        let mut reader = FrameReader::new();

        let frame = reader.poll(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"aBCTEMP21---");
        assert_eq!(reader.state(), ReaderState::Idle);
        assert_eq!(transport.inbound_len(), 0);
    }

    #[test]
    fn test_waits_for_full_frame() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"aBCTEMP");
        let mut reader = FrameReader::new();

        assert!(reader.poll(&mut transport).is_none());
        // Nothing consumed while short
        assert_eq!(transport.inbound_len(), 7);

        transport.push_inbound(b"21---");
        assert!(reader.poll(&mut transport).is_some());
    }

    #[test]
    fn test_discards_noise_before_marker() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"xyz");
        transport.push_inbound(b"aBCTEMP21---");
        let mut reader = FrameReader::new();

        let frame = reader.poll(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"aBCTEMP21---");
        assert_eq!(reader.stats().discarded, 3);
    }

    #[test]
    fn test_resyncs_on_embedded_marker() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"a");
        transport.push_inbound(b"aBCHELLO----");
        let mut reader = FrameReader::new();

        assert!(reader.poll(&mut transport).is_none());
        assert_eq!(reader.stats().desyncs, 1);

        let frame = reader.poll(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"aBCHELLO----");
    }

    #[test]
    fn test_truncated_frame_is_lost() {
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"aBCTE");
        transport.push_inbound(b"aDEACK------");
        let mut reader = FrameReader::new();

        assert!(reader.poll(&mut transport).is_none());
        let frame = reader.poll(&mut transport).unwrap();
        assert_eq!(frame.as_bytes(), b"aDEACK------");
        assert_eq!(reader.stats().frames, 1);
    }

    #[test]
    fn test_marker_in_last_position_is_kept() {
        // Only bytes 1..11 are checked for a following marker
        let mut transport = MemoryTransport::new();
        transport.push_inbound(b"aBCTEMP21---");
        transport.push_inbound(b"aBCTEMP22---");
        let mut reader = FrameReader::new();

        assert!(reader.poll(&mut transport).is_some());
        assert!(reader.poll(&mut transport).is_some());
        assert_eq!(reader.stats().desyncs, 0);
    }
}
