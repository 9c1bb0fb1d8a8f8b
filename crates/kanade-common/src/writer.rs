//! Binary writer producing big-endian output buffers.
//!
//! Counterpart of [`BinaryReader`](crate::BinaryReader) for the encode path:
//! an append-only byte buffer with big-endian integer writes and the padding
//! helpers the console formats need.

use byteorder::{BigEndian, WriteBytesExt};

/// An append-only binary writer. All multi-byte integers are written
/// big-endian.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buffer: Vec<u8>,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check whether nothing has been written yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Append a big-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        // Writing into a Vec cannot fail.
        let _ = self.buffer.write_u32::<BigEndian>(value);
    }

    /// Append a big-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) {
        let _ = self.buffer.write_i32::<BigEndian>(value);
    }

    /// Append a string followed by a null terminator.
    pub fn write_cstring(&mut self, value: &str) {
        self.buffer.extend_from_slice(value.as_bytes());
        self.buffer.push(0);
    }

    /// Pad with `fill` bytes until the length is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize, fill: u8) {
        let over = self.buffer.len() % alignment;
        if over != 0 {
            self.buffer.resize(self.buffer.len() + alignment - over, fill);
        }
    }

    /// Consume the writer and return the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    /// Borrow the bytes written so far.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u32(0x12345678);
        writer.write_i32(-1);

        assert_eq!(
            writer.into_vec(),
            [0x12, 0x34, 0x56, 0x78, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_write_cstring() {
        let mut writer = BinaryWriter::new();
        writer.write_cstring("abc");
        assert_eq!(writer.into_vec(), b"abc\0");
    }

    #[test]
    fn test_pad_to() {
        let mut writer = BinaryWriter::new();
        writer.write_bytes(b"abc");
        writer.pad_to(4, 0);
        assert_eq!(writer.len(), 4);

        // Already aligned: no change
        writer.pad_to(4, 0);
        assert_eq!(writer.len(), 4);
    }
}
