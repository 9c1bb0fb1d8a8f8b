//! The BXR string pool.
//!
//! One contiguous byte region holds every interned string, addressed by
//! byte offset. By convention the 8-bit region comes first; once it has
//! been padded to an even length, UTF-16BE strings follow. The sentinel
//! offset `-1` ("absent") is handled by callers; the pool itself only
//! deals in real offsets.

use kanade_common::memchr;

use crate::{Error, Result};

/// Interns and extracts null-terminated strings at explicit offsets inside
/// one contiguous byte chunk.
///
/// Offsets are positional: each `intern*` call appends at the current write
/// cursor and returns it. Iteration order is therefore externally
/// observable, and byte-identical re-encoding depends on it.
#[derive(Debug, Default)]
pub struct StringPool {
    bytes: Vec<u8>,
}

impl StringPool {
    /// Create an empty pool for encoding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a decoded string chunk for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Current size of the pool in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append `value` plus a null terminator to the 8-bit region and return
    /// its offset.
    pub fn intern(&mut self, value: &str) -> i32 {
        let offset = self.bytes.len() as i32;
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        offset
    }

    /// Pad the pool to an even byte count. Must be called once, between the
    /// last `intern` and the first `intern_wide`, so that every wide string
    /// starts on an even offset.
    pub fn pad_even(&mut self) {
        if self.bytes.len() % 2 != 0 {
            self.bytes.push(0);
        }
    }

    /// Append `value` as big-endian UTF-16 code units plus a two-byte null
    /// terminator and return its offset.
    pub fn intern_wide(&mut self, value: &str) -> i32 {
        let offset = self.bytes.len() as i32;
        for unit in value.encode_utf16() {
            self.bytes.extend_from_slice(&unit.to_be_bytes());
        }
        self.bytes.extend_from_slice(&[0, 0]);
        offset
    }

    /// Decode the null-terminated 8-bit string starting at `offset`.
    pub fn cstring_at(&self, offset: i32) -> Result<&str> {
        let start = self.check_offset(offset)?;

        let end = memchr::memchr(0, &self.bytes[start..])
            .ok_or(kanade_common::Error::MissingNullTerminator)?;

        std::str::from_utf8(&self.bytes[start..start + end]).map_err(Error::Utf8)
    }

    /// Decode the null-terminated UTF-16BE string starting at `offset`.
    pub fn wide_at(&self, offset: i32) -> Result<String> {
        let start = self.check_offset(offset)?;

        let mut units = Vec::new();
        let mut pos = start;
        loop {
            if pos + 2 > self.bytes.len() {
                return Err(kanade_common::Error::MissingNullTerminator.into());
            }
            let unit = u16::from_be_bytes([self.bytes[pos], self.bytes[pos + 1]]);
            if unit == 0 {
                break;
            }
            units.push(unit);
            pos += 2;
        }

        char::decode_utf16(units.into_iter())
            .collect::<std::result::Result<String, _>>()
            .map_err(|_| Error::WideString { offset })
    }

    /// Consume the pool and return the raw chunk.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn check_offset(&self, offset: i32) -> Result<usize> {
        if offset < 0 || offset as usize >= self.bytes.len() {
            return Err(Error::StringOffsetOutOfBounds {
                offset,
                size: self.bytes.len(),
            });
        }
        Ok(offset as usize)
    }
}
