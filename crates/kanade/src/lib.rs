//! Kanade - im@s console game file conversion and translation library.
//!
//! This crate provides a unified interface to the Kanade library ecosystem
//! for working with the game's asset files.
//!
//! # Crates
//!
//! - [`kanade_common`] - Common utilities (big-endian binary reading/writing)
//! - [`kanade_bna`] - BNA archive container (`.bna`) packing/unpacking
//! - [`kanade_bxr`] - BXR binary script (`.bxr`) decoding and encoding
//!
//! # Example
//!
//! ```no_run
//! use kanade::prelude::*;
//!
//! // Open an archive and pull a script out of it
//! let data = std::fs::read("scene.bna")?;
//! let archive = BnaArchive::parse(&data)?;
//!
//! let script = archive.read_by_path("scene/01/intro.bxr")?;
//! let document = Bxr::parse(script)?;
//! println!("{}", document.to_xml_string()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use kanade_bna as bna;
pub use kanade_bxr as bxr;
pub use kanade_common as common;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use kanade_bna::{BnaArchive, BnaEntry};
    pub use kanade_bxr::{Bxr, Leaf, Node};
    pub use kanade_common::{BinaryReader, BinaryWriter};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
