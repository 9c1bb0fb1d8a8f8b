//! The flat on-disk record layout.
//!
//! A BXR file is a fixed header, two tag offset tables, the main and sub
//! item record arrays, and the string chunk, in that order. All integers
//! are 32-bit big-endian.
//!
//! ```text
//! "BXR0" | counts (5 x i32) | main tag offsets | sub tag offsets
//!        | main records (7 x i32 each) | sub records (3 x i32 each)
//!        | string chunk
//! ```

use kanade_common::{BinaryReader, BinaryWriter};

use crate::{Error, Result};

/// Magic bytes at the start of a BXR file.
pub const MAGIC: &[u8; 4] = b"BXR0";

/// Header size: magic plus the five counts.
pub const HEADER_SIZE: usize = 4 + 5 * 4;

/// On-disk size of one main item record.
pub const MAIN_RECORD_SIZE: usize = 7 * 4;

/// On-disk size of one sub item record.
pub const SUB_RECORD_SIZE: usize = 3 * 4;

/// Sentinel for "absent" offsets and indices.
pub const NONE: i32 = -1;

/// Raw main item record: one tree node in flattening (pre-order) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MainRecord {
    /// Index of the previous main item, -1 if first.
    pub before: i32,
    /// Index of the next main item, -1 if last.
    pub next: i32,
    /// Index into the main tag table.
    pub data_tag: i32,
    /// String pool offset of the scalar value, -1 if absent.
    pub scalar_offset: i32,
    /// Index of the first sub record of this node's leaf chain, -1 if none.
    pub first_leaf: i32,
    /// String pool offset of the wide value, -1 if absent.
    pub wide_offset: i32,
    /// Index of the first main item not in this node's subtree.
    pub next_ticks: i32,
}

impl MainRecord {
    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            before: reader.read_i32()?,
            next: reader.read_i32()?,
            data_tag: reader.read_i32()?,
            scalar_offset: reader.read_i32()?,
            first_leaf: reader.read_i32()?,
            wide_offset: reader.read_i32()?,
            next_ticks: reader.read_i32()?,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        writer.write_i32(self.before);
        writer.write_i32(self.next);
        writer.write_i32(self.data_tag);
        writer.write_i32(self.scalar_offset);
        writer.write_i32(self.first_leaf);
        writer.write_i32(self.wide_offset);
        writer.write_i32(self.next_ticks);
    }
}

/// Raw sub item record: one leaf, chained to its siblings via `next`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRecord {
    /// Index of the next leaf of the same node, -1 if last.
    pub next: i32,
    /// Index into the sub tag table.
    pub data_tag: i32,
    /// String pool offset of the text value.
    pub value_offset: i32,
}

impl SubRecord {
    fn read(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            next: reader.read_i32()?,
            data_tag: reader.read_i32()?,
            value_offset: reader.read_i32()?,
        })
    }

    fn write(&self, writer: &mut BinaryWriter) {
        writer.write_i32(self.next);
        writer.write_i32(self.data_tag);
        writer.write_i32(self.value_offset);
    }
}

/// A fully decoded flat record set: everything in the file, still
/// unlinked. [`Bxr::parse`](crate::Bxr::parse) turns this into a tree,
/// the builder produces it from one.
#[derive(Debug, Default)]
pub struct RawBxr {
    /// String pool offsets of the main tag names.
    pub main_tag_offsets: Vec<i32>,
    /// String pool offsets of the sub tag names.
    pub sub_tag_offsets: Vec<i32>,
    /// Main item records in flattening order.
    pub main_records: Vec<MainRecord>,
    /// Sub item records.
    pub sub_records: Vec<SubRecord>,
    /// The string chunk: 8-bit region (even-padded), then UTF-16BE region.
    pub string_chunk: Vec<u8>,
}

impl RawBxr {
    /// Check if data starts with the BXR magic.
    pub fn is_bxr(data: &[u8]) -> bool {
        data.len() >= MAGIC.len() && &data[..MAGIC.len()] == MAGIC
    }

    /// Read the flat record set from a byte buffer.
    ///
    /// Validates the magic first, then reads the five counts, the two tag
    /// offset tables, the record arrays, and finally the string chunk as
    /// one block. No seeking: the file is one sequential layout.
    pub fn read(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(MAGIC)?;

        let main_tag_count = reader.read_u32()? as usize;
        let sub_tag_count = reader.read_u32()? as usize;
        let main_count = reader.read_u32()? as usize;
        let sub_count = reader.read_u32()? as usize;
        let chunk_size = reader.read_u32()? as usize;

        // Reject impossible counts before allocating anything.
        let needed = (main_tag_count + sub_tag_count)
            .checked_mul(4)
            .and_then(|n| n.checked_add(main_count.checked_mul(MAIN_RECORD_SIZE)?))
            .and_then(|n| n.checked_add(sub_count.checked_mul(SUB_RECORD_SIZE)?))
            .and_then(|n| n.checked_add(chunk_size))
            .ok_or(Error::Truncated {
                needed: usize::MAX,
                available: reader.remaining(),
            })?;
        if needed > reader.remaining() {
            return Err(Error::Truncated {
                needed,
                available: reader.remaining(),
            });
        }

        let mut main_tag_offsets = Vec::with_capacity(main_tag_count);
        for _ in 0..main_tag_count {
            main_tag_offsets.push(reader.read_i32()?);
        }

        let mut sub_tag_offsets = Vec::with_capacity(sub_tag_count);
        for _ in 0..sub_tag_count {
            sub_tag_offsets.push(reader.read_i32()?);
        }

        let mut main_records = Vec::with_capacity(main_count);
        for _ in 0..main_count {
            main_records.push(MainRecord::read(&mut reader)?);
        }

        let mut sub_records = Vec::with_capacity(sub_count);
        for _ in 0..sub_count {
            sub_records.push(SubRecord::read(&mut reader)?);
        }

        let string_chunk = reader.read_bytes(chunk_size)?.to_vec();

        Ok(Self {
            main_tag_offsets,
            sub_tag_offsets,
            main_records,
            sub_records,
            string_chunk,
        })
    }

    /// Serialize the flat record set. Exact inverse of [`RawBxr::read`]
    /// given already-assigned offsets and indices.
    pub fn write(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.byte_size());

        writer.write_bytes(MAGIC);
        writer.write_u32(self.main_tag_offsets.len() as u32);
        writer.write_u32(self.sub_tag_offsets.len() as u32);
        writer.write_u32(self.main_records.len() as u32);
        writer.write_u32(self.sub_records.len() as u32);
        writer.write_u32(self.string_chunk.len() as u32);

        for &offset in &self.main_tag_offsets {
            writer.write_i32(offset);
        }
        for &offset in &self.sub_tag_offsets {
            writer.write_i32(offset);
        }
        for record in &self.main_records {
            record.write(&mut writer);
        }
        for record in &self.sub_records {
            record.write(&mut writer);
        }
        writer.write_bytes(&self.string_chunk);

        writer.into_vec()
    }

    /// Exact serialized size in bytes.
    pub fn byte_size(&self) -> usize {
        HEADER_SIZE
            + (self.main_tag_offsets.len() + self.sub_tag_offsets.len()) * 4
            + self.main_records.len() * MAIN_RECORD_SIZE
            + self.sub_records.len() * SUB_RECORD_SIZE
            + self.string_chunk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawBxr {
        RawBxr {
            main_tag_offsets: vec![0],
            sub_tag_offsets: vec![6, 10],
            main_records: vec![MainRecord {
                before: -1,
                next: -1,
                data_tag: 0,
                scalar_offset: -1,
                first_leaf: -1,
                wide_offset: -1,
                next_ticks: 1,
            }],
            sub_records: vec![],
            string_chunk: b"title\0sym\0line\0\0".to_vec(),
        }
    }

    #[test]
    fn test_write_read_round_trip() {
        let raw = sample();
        let bytes = raw.write();

        assert_eq!(bytes.len(), raw.byte_size());
        assert!(RawBxr::is_bxr(&bytes));

        let reread = RawBxr::read(&bytes).unwrap();
        assert_eq!(reread.main_tag_offsets, raw.main_tag_offsets);
        assert_eq!(reread.sub_tag_offsets, raw.sub_tag_offsets);
        assert_eq!(reread.main_records, raw.main_records);
        assert_eq!(reread.sub_records, raw.sub_records);
        assert_eq!(reread.string_chunk, raw.string_chunk);
    }

    #[test]
    fn test_bad_signature() {
        let mut bytes = sample().write();
        bytes[3] = b'1'; // "BXR1"

        assert!(matches!(
            RawBxr::read(&bytes),
            Err(Error::BadSignature { .. })
        ));
    }

    #[test]
    fn test_truncated_records() {
        let bytes = sample().write();
        let cut = &bytes[..bytes.len() - 8];

        assert!(matches!(RawBxr::read(cut), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_huge_counts_rejected() {
        let mut writer = kanade_common::BinaryWriter::new();
        writer.write_bytes(MAGIC);
        writer.write_u32(u32::MAX);
        writer.write_u32(u32::MAX);
        writer.write_u32(u32::MAX);
        writer.write_u32(u32::MAX);
        writer.write_u32(u32::MAX);

        assert!(matches!(
            RawBxr::read(&writer.into_vec()),
            Err(Error::Truncated { .. })
        ));
    }
}
