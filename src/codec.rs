use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{Error, Frame, Token, MAX_NESTING_DEPTH, MAX_PREALLOCATED_ELEMENTS};

pub const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

/// Splits the byte stream of a connection into frames. Bytes that don't yet form a complete token
/// stay in the read buffer until the next read completes them. Tokens already read for a frame
/// that is still arriving are kept in the codec, so each byte is only parsed once.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_frame_size: usize,
    // Arrays of the current frame that are still missing elements, outermost first.
    pending: Vec<PartialArray>,
    // Bytes of the current frame already removed from the read buffer.
    consumed: usize,
}

#[derive(Debug, Clone)]
struct PartialArray {
    length: usize,
    frames: Vec<Frame>,
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            pending: Vec::new(),
            consumed: 0,
        }
    }

    fn reset(&mut self) {
        self.pending.clear();
        self.consumed = 0;
    }

    /// Adds a finished frame to the innermost pending array. Returns the top level frame once it
    /// is complete.
    fn complete(&mut self, mut frame: Frame) -> Option<Frame> {
        while let Some(mut parent) = self.pending.pop() {
            parent.frames.push(frame);
            if parent.frames.len() < parent.length {
                self.pending.push(parent);
                return None;
            }
            frame = Frame::Array(parent.frames);
        }

        self.consumed = 0;
        Some(frame)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let mut cursor = Cursor::new(&src[..]);
            let token = match Frame::parse_token(&mut cursor) {
                Ok(token) => token,
                // Not enough data to parse a token, unless the client already went over the limit.
                Err(Error::Incomplete) if self.consumed + src.len() > self.max_frame_size => {
                    self.reset();
                    return Err(Error::FrameTooLarge(self.max_frame_size));
                }
                Err(Error::Incomplete) => return Ok(None),
                Err(err) => {
                    self.reset();
                    return Err(err);
                }
            };

            let position = cursor.position() as usize;

            // Remove the parsed token from the buffer.
            src.advance(position);
            self.consumed += position;
            if self.consumed > self.max_frame_size {
                self.reset();
                return Err(Error::FrameTooLarge(self.max_frame_size));
            }

            let frame = match token {
                Token::ArrayHeader(0) => Frame::Array(Vec::new()),
                Token::ArrayHeader(_) if self.pending.len() >= MAX_NESTING_DEPTH => {
                    self.reset();
                    return Err(Error::NestingTooDeep(MAX_NESTING_DEPTH));
                }
                Token::ArrayHeader(length) => {
                    self.pending.push(PartialArray::new(length));
                    continue;
                }
                Token::Frame(frame) => frame,
            };

            if let Some(frame) = self.complete(frame) {
                return Ok(Some(frame));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() && self.pending.is_empty() => Ok(None),
            None => {
                self.reset();
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a frame",
                )
                .into())
            }
        }
    }
}

impl PartialArray {
    fn new(length: usize) -> Self {
        Self {
            length,
            frames: Vec::with_capacity(length.min(MAX_PREALLOCATED_ELEMENTS)),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = Error;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&frame.serialize());
        Ok(())
    }
}
