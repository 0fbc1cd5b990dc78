use bytes::{Buf, Bytes, BytesMut};
use std::ops::Range;
use std::str;

use crate::error::FrameError;

/// Largest bulk string a client may declare.
pub const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Largest element count a client may declare for one command.
pub const MAX_ARRAY_LEN: i64 = 1024 * 1024;

// Long enough for any i64 in decimal, sign included.
const MAX_HEADER_LEN: usize = 20;

/// One decoded request: the command name followed by its operands.
pub type Frame = Vec<Bytes>;

pub struct RespParser;

impl RespParser {
    /// Parse a single command frame from the head of `buffer`.
    ///
    /// Returns `Ok(None)` when the buffer holds only part of a frame; nothing
    /// is consumed and the caller should retry once more bytes arrive.
    /// On success returns the arguments and the exact number of bytes the
    /// frame occupied, terminators included.
    pub fn parse_frame(buffer: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
        let Some((count, mut pos)) = Self::parse_array_header(buffer)? else {
            return Ok(None);
        };

        let mut args = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            match Self::parse_bulk_bounds(&buffer[pos..])? {
                Some((payload, consumed)) => {
                    args.push(Bytes::copy_from_slice(&buffer[pos..][payload]));
                    pos += consumed;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((args, pos)))
    }

    /// Element count and header length of the array opening a frame. Null and
    /// empty arrays both report zero elements.
    fn parse_array_header(buffer: &[u8]) -> Result<Option<(usize, usize)>, FrameError> {
        let Some(&marker) = buffer.first() else {
            return Ok(None);
        };
        if marker != b'*' {
            return Err(FrameError::UnexpectedByte {
                expected: '*',
                found: marker,
            });
        }

        let Some((count, consumed)) = Self::parse_header(&buffer[1..])? else {
            return Ok(None);
        };
        if count < -1 {
            return Err(FrameError::InvalidLength(count.to_string()));
        }
        if count > MAX_ARRAY_LEN {
            return Err(FrameError::ArrayTooLarge(count));
        }

        Ok(Some((count.max(0) as usize, 1 + consumed)))
    }

    /// Locate the payload of the bulk string at the head of `buffer`. Returns
    /// the payload range and the bytes the whole element occupies.
    fn parse_bulk_bounds(buffer: &[u8]) -> Result<Option<(Range<usize>, usize)>, FrameError> {
        let Some(&marker) = buffer.first() else {
            return Ok(None);
        };
        if marker != b'$' {
            return Err(FrameError::UnexpectedByte {
                expected: '$',
                found: marker,
            });
        }

        let Some((length, consumed)) = Self::parse_header(&buffer[1..])? else {
            return Ok(None);
        };
        if length < 0 {
            return Err(FrameError::InvalidLength(length.to_string()));
        }
        if length > MAX_BULK_LEN {
            return Err(FrameError::BulkTooLarge(length));
        }

        let start = 1 + consumed;
        let end = start + length as usize;
        if buffer.len() < end + 2 {
            return Ok(None);
        }
        if &buffer[end..end + 2] != b"\r\n" {
            return Err(FrameError::MissingTerminator);
        }

        Ok(Some((start..end, end + 2)))
    }

    /// Parse the decimal that follows a type marker, up to and including CRLF.
    fn parse_header(buffer: &[u8]) -> Result<Option<(i64, usize)>, FrameError> {
        let window = &buffer[..buffer.len().min(MAX_HEADER_LEN + 1)];

        let Some(cr) = window.iter().position(|&b| b == b'\r') else {
            if buffer.len() > MAX_HEADER_LEN {
                return Err(FrameError::InvalidLength("header line too long".to_string()));
            }
            if let Some(&b) = buffer.iter().find(|&&b| !is_decimal_byte(b)) {
                return Err(FrameError::InvalidLength(format!("unexpected byte 0x{:02x}", b)));
            }
            return Ok(None);
        };

        let digits = &buffer[..cr];
        let value = str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| FrameError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;

        match buffer.get(cr + 1) {
            None => Ok(None),
            Some(b'\n') => Ok(Some((value, cr + 2))),
            Some(_) => Err(FrameError::InvalidLength("CR without LF".to_string())),
        }
    }
}

/// Incremental frame decoder for a connection's read buffer.
///
/// Complete elements are taken out of the buffer as soon as they arrive, so a
/// frame trickling in over many reads is scanned once rather than re-parsed
/// from its first byte on every attempt.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    partial: Option<PartialFrame>,
}

#[derive(Debug)]
struct PartialFrame {
    args: Frame,
    remaining: usize,
    buffered: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next frame from `buffer`, consuming every byte it used.
    ///
    /// `Ok(None)` means more input is needed; elements already completed are
    /// kept and the rest of the frame is picked up on the next call.
    pub fn decode(&mut self, buffer: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        let mut partial = match self.partial.take() {
            Some(partial) => partial,
            None => {
                let Some((count, consumed)) = RespParser::parse_array_header(buffer)? else {
                    return Ok(None);
                };
                buffer.advance(consumed);
                PartialFrame {
                    args: Vec::with_capacity(count.min(16)),
                    remaining: count,
                    buffered: 0,
                }
            }
        };

        while partial.remaining > 0 {
            let Some((payload, consumed)) = RespParser::parse_bulk_bounds(buffer)? else {
                self.partial = Some(partial);
                return Ok(None);
            };
            partial.args.push(Bytes::copy_from_slice(&buffer[payload]));
            partial.buffered += consumed;
            partial.remaining -= 1;
            buffer.advance(consumed);
        }

        Ok(Some(partial.args))
    }

    /// Bytes of a partly decoded frame held outside the read buffer.
    pub fn buffered_len(&self) -> usize {
        self.partial.as_ref().map_or(0, |partial| partial.buffered)
    }
}

fn is_decimal_byte(b: u8) -> bool {
    b.is_ascii_digit() || b == b'-' || b == b'+'
}
