//! Common utilities for Kanade.
//!
//! This crate provides foundational types used across all Kanade crates:
//!
//! - [`BinaryReader`] - Zero-copy big-endian reading from byte slices
//! - [`BinaryWriter`] - Big-endian output buffer assembly
//! - [`Error`] - Shared low-level error type

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export memchr for SIMD-accelerated byte searching
pub use memchr;
