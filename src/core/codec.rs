//! Newline framing for the package index protocol.
//!
//! The decoder hands out each raw line with its terminator still attached so
//! that message parsing can tell a complete line from a truncated one.

use crate::error::{IndexerError, Result};
use crate::protocol::message::{Request, Response};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Default upper bound for a single request line (64 KiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// One unit produced by [`LineCodec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A raw line, newline included. Only the final line of a stream may
    /// lack it.
    Line(String),
    /// A line longer than the configured limit was dropped; carries the limit
    Oversized(usize),
    /// A complete line that is not valid UTF-8 was dropped
    Malformed,
}

/// Line framing codec.
///
/// Lines longer than `max_length` are discarded up to the next newline and
/// reported as [`Frame::Oversized`], keeping the connection usable.
#[derive(Debug, Clone)]
pub struct LineCodec {
    max_length: usize,
    // Index to resume the newline search from
    next_index: usize,
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Names are compared byte for byte, so a line that is not UTF-8 is
    /// rejected rather than repaired.
    #[inline]
    fn take_line(buf: &mut BytesMut, len: usize) -> Frame {
        let line = buf.split_to(len);
        match String::from_utf8(line.to_vec()) {
            Ok(line) => Frame::Line(line),
            Err(_) => Frame::Malformed,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = IndexerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            // Never scan further than one byte past the limit
            let read_to = std::cmp::min(self.max_length.saturating_add(1), src.len());
            let newline = src[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    src.advance(offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                    return Ok(Some(Frame::Oversized(self.max_length)));
                }
                (true, None) => {
                    src.advance(read_to);
                    self.next_index = 0;
                    if src.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    self.next_index = 0;
                    return Ok(Some(Self::take_line(src, offset + 1)));
                }
                (false, None) if src.len() > self.max_length => {
                    self.discarding = true;
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }

        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            src.clear();
            return Ok(Some(Frame::Oversized(self.max_length)));
        }

        if src.is_empty() {
            Ok(None)
        } else {
            // Trailing bytes without a terminator
            let len = src.len();
            Ok(Some(Self::take_line(src, len)))
        }
    }
}

impl Encoder<Response> for LineCodec {
    type Error = IndexerError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<()> {
        let wire = item.as_wire();
        dst.reserve(wire.len());
        dst.put_slice(wire.as_bytes());
        Ok(())
    }
}

impl Encoder<&Request> for LineCodec {
    type Error = IndexerError;

    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<()> {
        let line = item.to_line();
        dst.reserve(line.len());
        dst.put_slice(line.as_bytes());
        Ok(())
    }
}

impl Encoder<&str> for LineCodec {
    type Error = IndexerError;

    /// Raw line passthrough, written exactly as given
    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.len());
        dst.put_slice(item.as_bytes());
        Ok(())
    }
}

/// Client-side codec: status lines in, request lines out
#[derive(Debug, Clone, Default)]
pub struct ResponseCodec {
    lines: LineCodec,
}

impl ResponseCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ResponseCodec {
    type Item = Response;
    type Error = IndexerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Response>> {
        match self.lines.decode(src)? {
            Some(Frame::Line(line)) => Response::parse(&line).map(Some),
            Some(Frame::Oversized(limit)) => Err(IndexerError::LineTooLong { limit }),
            Some(Frame::Malformed) => Err(IndexerError::MalformedMessage),
            None => Ok(None),
        }
    }
}

impl Encoder<&Request> for ResponseCodec {
    type Error = IndexerError;

    fn encode(&mut self, item: &Request, dst: &mut BytesMut) -> Result<()> {
        self.lines.encode(item, dst)
    }
}

impl Encoder<&str> for ResponseCodec {
    type Error = IndexerError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<()> {
        self.lines.encode(item, dst)
    }
}
