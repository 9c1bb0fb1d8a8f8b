//! Error types for BXR decoding and encoding.

use thiserror::Error;

/// Errors that can occur when decoding or encoding BXR files.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not a BXR file (magic mismatch).
    #[error("invalid BXR magic: expected 'BXR0', got {actual:?}")]
    BadSignature { actual: Vec<u8> },

    /// The stream ended before a declared count was satisfied.
    #[error("truncated file: needed {needed} more bytes but only {available} available")]
    Truncated { needed: usize, available: usize },

    /// A record field indexes outside its table's bounds.
    #[error("dangling {kind} reference: index {index} out of bounds (table size: {count})")]
    DanglingReference {
        kind: &'static str,
        index: i32,
        count: usize,
    },

    /// String pool offset out of bounds.
    #[error("string offset {offset} out of bounds (pool size: {size})")]
    StringOffsetOutOfBounds { offset: i32, size: usize },

    /// The property name could not be recovered: the sub tag table must
    /// contain exactly one tag referenced by zero leaf records.
    #[error("property name ambiguous: {unreferenced} sub tags have zero leaf references")]
    PropertyNameAmbiguous { unreferenced: usize },

    /// A subtree end marker does not describe a valid nesting.
    #[error("inconsistent hierarchy: item {index} has subtree end {next_ticks}")]
    InconsistentHierarchy { index: usize, next_ticks: i32 },

    /// A leaf chain does not terminate within the sub item table.
    #[error("leaf chain starting at {start} does not terminate")]
    LeafChainCycle { start: usize },

    /// A wide string region did not decode as UTF-16.
    #[error("invalid UTF-16 data at string offset {offset}")]
    WideString { offset: i32 },

    /// Common library error.
    #[error("{0}")]
    Common(kanade_common::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    Xml(String),
}

impl From<kanade_common::Error> for Error {
    fn from(err: kanade_common::Error) -> Self {
        match err {
            kanade_common::Error::UnexpectedEof { needed, available } => {
                Error::Truncated { needed, available }
            }
            kanade_common::Error::InvalidMagic { actual, .. } => {
                Error::BadSignature { actual }
            }
            kanade_common::Error::Utf8(e) => Error::Utf8(e),
            other => Error::Common(other),
        }
    }
}

/// Result type for BXR operations.
pub type Result<T> = std::result::Result<T, Error>;
