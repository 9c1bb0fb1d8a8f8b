//! Error types for the BNA crate.

use thiserror::Error;

/// Errors that can occur when working with BNA archives.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Not a BNA file (magic mismatch).
    #[error("invalid BNA magic: expected 'BNA0', got {actual:?}")]
    BadSignature { actual: Vec<u8> },

    /// The buffer ended before a declared count or size was satisfied.
    #[error("truncated archive: needed {needed} more bytes but only {available} available")]
    Truncated { needed: usize, available: usize },

    /// A name or data offset points outside the archive.
    #[error("{kind} region [{offset}, +{size}) out of bounds (archive size: {total})")]
    RegionOutOfBounds {
        kind: &'static str,
        offset: u32,
        size: u32,
        total: usize,
    },

    /// Entry not found.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Common library error.
    #[error("{0}")]
    Common(kanade_common::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

impl From<kanade_common::Error> for Error {
    fn from(err: kanade_common::Error) -> Self {
        match err {
            kanade_common::Error::UnexpectedEof { needed, available } => {
                Error::Truncated { needed, available }
            }
            kanade_common::Error::InvalidMagic { actual, .. } => Error::BadSignature { actual },
            kanade_common::Error::Utf8(e) => Error::Utf8(e),
            other => Error::Common(other),
        }
    }
}

/// Result type for BNA operations.
pub type Result<T> = std::result::Result<T, Error>;
