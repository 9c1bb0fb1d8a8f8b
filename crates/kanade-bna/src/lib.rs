//! BNA archive container for im@s console game files.
//!
//! BNA is the flat archive format the game ships its assets in: a header
//! table of (directory, name, offset, size) records, a shared name region,
//! and raw payloads aligned to 0x80. Payloads are opaque byte buffers;
//! codecs for the formats inside (BXR scripts and the rest) live in their
//! own crates.
//!
//! # Example
//!
//! ```no_run
//! use kanade_bna::BnaArchive;
//!
//! let data = std::fs::read("scene.bna")?;
//! let mut archive = BnaArchive::parse(&data)?;
//!
//! let script = archive.read_by_path("scene/01/intro.bxr")?.to_vec();
//! archive.replace("scene/01/intro.bxr", script)?;
//! std::fs::write("scene.bna", archive.to_bytes())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod archive;
mod entry;
mod error;

pub use archive::{BnaArchive, MAGIC};
pub use entry::BnaEntry;
pub use error::{Error, Result};
