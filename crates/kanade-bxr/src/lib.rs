//! BXR binary script codec for im@s console game files.
//!
//! BXR is a binary encoding of an XML-like hierarchical document: elements
//! with a tag name, an optional scalar attribute, an optional wide-string
//! (Japanese text) attribute, and ordered text-valued children. The tree is
//! stored flat: pre-order record arrays with subtree end markers, two
//! deduplicated tag name tables, and a single string pool mixing 8-bit and
//! UTF-16BE strings.
//!
//! Decode and encode are mutually inverse to byte precision for files the
//! encoder produced, which is what makes in-place translation editing
//! (decode, edit strings, re-encode) safe.
//!
//! # Example
//!
//! ```no_run
//! use kanade_bxr::Bxr;
//!
//! let data = std::fs::read("script.bxr")?;
//!
//! if Bxr::is_bxr(&data) {
//!     let document = Bxr::parse(&data)?;
//!     let xml = document.to_xml_string()?;
//!     println!("{}", xml);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod document;
mod error;
mod layout;
mod parser;
mod records;
mod strings;
mod tags;
#[cfg(feature = "xml")]
mod xml;

pub use document::{Bxr, Leaf, Node, DEFAULT_PROPERTY_NAME};
pub use error::{Error, Result};
pub use records::{MainRecord, RawBxr, SubRecord, MAGIC};
pub use strings::StringPool;
pub use tags::TagTable;
