//! BNA archive parsing and rebuilding.
//!
//! Layout, all integers 32-bit big-endian:
//!
//! ```text
//! "BNA0" | file count | per file: dir name offset, file name offset,
//!                       data offset, data size
//!        | name region (each directory name once, then its file names,
//!          all null-terminated)
//!        | data region (each payload aligned to 0x80)
//! ```

use std::collections::HashMap;

use kanade_common::{memchr, BinaryReader, BinaryWriter};

use crate::{BnaEntry, Error, Result};

/// Magic bytes at the start of a BNA archive.
pub const MAGIC: &[u8; 4] = b"BNA0";

/// Alignment of each payload in the data region.
const DATA_ALIGN: usize = 0x80;

/// Size of one entry in the header table.
const ENTRY_SIZE: usize = 16;

/// An in-memory BNA archive.
///
/// Parsing loads every payload eagerly; the toolkit's workflow is
/// read-modify-repack over whole archives, and the console's archives are
/// small enough that lazy fetching buys nothing.
#[derive(Debug, Default)]
pub struct BnaArchive {
    entries: Vec<BnaEntry>,
}

impl BnaArchive {
    /// Check if data is a BNA archive by checking the magic bytes.
    pub fn is_bna(data: &[u8]) -> bool {
        data.len() >= MAGIC.len() && &data[..MAGIC.len()] == MAGIC
    }

    /// Parse an archive from bytes.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(MAGIC)?;

        let count = reader.read_u32()? as usize;
        let table_size = count
            .checked_mul(ENTRY_SIZE)
            .ok_or(Error::Truncated {
                needed: usize::MAX,
                available: reader.remaining(),
            })?;
        if table_size > reader.remaining() {
            return Err(Error::Truncated {
                needed: table_size,
                available: reader.remaining(),
            });
        }

        let mut headers = Vec::with_capacity(count);
        for _ in 0..count {
            let dir_offset = reader.read_u32()?;
            let name_offset = reader.read_u32()?;
            let data_offset = reader.read_u32()?;
            let data_size = reader.read_u32()?;
            headers.push((dir_offset, name_offset, data_offset, data_size));
        }

        // Directory names repeat across entries; resolve each offset once.
        let mut dir_cache: HashMap<u32, String> = HashMap::new();

        let mut entries = Vec::with_capacity(count);
        for (dir_offset, name_offset, data_offset, data_size) in headers {
            let dir = match dir_cache.get(&dir_offset) {
                Some(dir) => dir.clone(),
                None => {
                    let dir = read_name(data, dir_offset)?.to_owned();
                    dir_cache.insert(dir_offset, dir.clone());
                    dir
                }
            };
            let name = read_name(data, name_offset)?.to_owned();

            let start = data_offset as usize;
            let end = start
                .checked_add(data_size as usize)
                .filter(|&end| end <= data.len())
                .ok_or(Error::RegionOutOfBounds {
                    kind: "file data",
                    offset: data_offset,
                    size: data_size,
                    total: data.len(),
                })?;

            entries.push(BnaEntry::new(dir, name, data[start..end].to_vec()));
        }

        Ok(Self { entries })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in archive order.
    pub fn entries(&self) -> &[BnaEntry] {
        &self.entries
    }

    /// Find an entry by its full `dir/name` path.
    pub fn get(&self, path: &str) -> Option<&BnaEntry> {
        self.entries.iter().find(|e| e.full_path() == path)
    }

    /// Read an entry's payload by its full `dir/name` path.
    pub fn read_by_path(&self, path: &str) -> Result<&[u8]> {
        self.get(path)
            .map(BnaEntry::data)
            .ok_or_else(|| Error::EntryNotFound(path.to_owned()))
    }

    /// Replace an entry's payload by its full `dir/name` path. The entry
    /// keeps its position; offsets are recomputed on [`BnaArchive::to_bytes`].
    pub fn replace(&mut self, path: &str, data: Vec<u8>) -> Result<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.full_path() == path)
            .ok_or_else(|| Error::EntryNotFound(path.to_owned()))?;
        entry.set_data(data);
        Ok(())
    }

    /// Iterate over entries with the given extension (without the dot).
    pub fn by_extension<'a>(&'a self, ext: &'a str) -> impl Iterator<Item = &'a BnaEntry> {
        self.entries
            .iter()
            .filter(move |e| e.extension() == Some(ext))
    }

    /// Serialize the archive, recomputing every offset.
    ///
    /// Entry order is preserved from parse; directory names are written
    /// once each in first-seen order, followed by that directory's file
    /// names, then payloads each aligned to 0x80.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Name region layout and offsets.
        let header_size = 8 + self.entries.len() * ENTRY_SIZE;
        let mut name_buf = BinaryWriter::new();
        let mut dir_offsets: HashMap<&str, u32> = HashMap::new();
        let mut name_offsets = vec![0u32; self.entries.len()];

        let mut dirs: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !dir_offsets.contains_key(entry.dir()) {
                dirs.push(entry.dir());
                dir_offsets.insert(entry.dir(), 0);
            }
        }

        for &dir in &dirs {
            dir_offsets.insert(dir, (header_size + name_buf.len()) as u32);
            name_buf.write_cstring(dir);
            for (i, entry) in self.entries.iter().enumerate() {
                if entry.dir() == dir {
                    name_offsets[i] = (header_size + name_buf.len()) as u32;
                    name_buf.write_cstring(entry.name());
                }
            }
        }

        // Data region offsets.
        let mut cursor = header_size + name_buf.len();
        let mut data_offsets = vec![0u32; self.entries.len()];
        for (i, entry) in self.entries.iter().enumerate() {
            cursor = pad_value(cursor, DATA_ALIGN);
            data_offsets[i] = cursor as u32;
            cursor += entry.size();
        }

        let mut writer = BinaryWriter::with_capacity(cursor);
        writer.write_bytes(MAGIC);
        writer.write_u32(self.entries.len() as u32);
        for (i, entry) in self.entries.iter().enumerate() {
            writer.write_u32(dir_offsets[entry.dir()]);
            writer.write_u32(name_offsets[i]);
            writer.write_u32(data_offsets[i]);
            writer.write_u32(entry.size() as u32);
        }
        writer.write_bytes(name_buf.as_slice());
        for entry in &self.entries {
            writer.pad_to(DATA_ALIGN, 0);
            writer.write_bytes(entry.data());
        }

        writer.into_vec()
    }
}

fn pad_value(value: usize, align: usize) -> usize {
    let over = value % align;
    if over == 0 {
        value
    } else {
        value + align - over
    }
}

/// Read a null-terminated name at an absolute offset, bounds-checked.
fn read_name(data: &[u8], offset: u32) -> Result<&str> {
    let start = offset as usize;
    if start >= data.len() {
        return Err(Error::RegionOutOfBounds {
            kind: "name",
            offset,
            size: 0,
            total: data.len(),
        });
    }

    let end = memchr::memchr(0, &data[start..])
        .ok_or(kanade_common::Error::MissingNullTerminator)?;

    std::str::from_utf8(&data[start..start + end]).map_err(Error::Utf8)
}
