//! Binary wire primitives.
//!
//! All integers are little-endian. Strings are a one-byte byte length
//! followed by UTF-32 code units, never null-terminated.

use thiserror::Error;

use crate::packet::PacketId;
use crate::{MAX_STRING_CHARS, MAX_STRING_DATA_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet id {0}")]
    UnknownPacket(u8),
    #[error("{id:?} payload is {actual} bytes, expected {expected}")]
    LengthMismatch {
        id: PacketId,
        expected: usize,
        actual: usize,
    },
    #[error("truncated payload: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("{0} trailing bytes after payload")]
    TrailingBytes(usize),
    #[error("string length {0} is not a multiple of 4")]
    UnalignedString(usize),
    #[error("string length {0} exceeds {MAX_STRING_DATA_SIZE} bytes")]
    StringTooLong(usize),
    #[error("invalid code point {0:#x}")]
    InvalidCodePoint(u32),
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u8 },
    #[error("player count {0} out of range")]
    PlayerCount(u8),
    #[error("roster entry is {actual} bytes, expected {expected}")]
    RosterLength { expected: usize, actual: usize },
}

/// Cursor over a received payload
pub struct WireReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < len {
            return Err(WireError::Truncated {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Reads a length-prefixed UTF-32 string.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let len = self.read_u8()? as usize;
        if len % 4 != 0 {
            return Err(WireError::UnalignedString(len));
        }
        if len > MAX_STRING_DATA_SIZE {
            return Err(WireError::StringTooLong(len));
        }

        let data = self.read_bytes(len)?;
        data.chunks_exact(4)
            .map(|unit| {
                let code = u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]);
                char::from_u32(code).ok_or(WireError::InvalidCodePoint(code))
            })
            .collect()
    }

    /// Fails unless the whole payload was consumed.
    pub fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

/// Growable output buffer
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pads with zeros up to `len` total bytes.
    pub fn pad_to(&mut self, len: usize) {
        if self.buf.len() < len {
            self.buf.resize(len, 0);
        }
    }

    /// Writes a length-prefixed UTF-32 string, truncated to `MAX_STRING_CHARS`.
    pub fn write_string(&mut self, value: &str) {
        let chars: Vec<char> = value.chars().take(MAX_STRING_CHARS).collect();
        self.write_u8((chars.len() * 4) as u8);
        for c in chars {
            self.write_u32(c as u32);
        }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Truncates a string the same way the encoder does.
pub fn clamp_string(value: &str) -> String {
    value.chars().take(MAX_STRING_CHARS).collect()
}
