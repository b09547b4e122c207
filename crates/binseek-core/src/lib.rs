//! # binseek-core
//!
//! A library for decoding fixed-layout binary data, from in-memory buffers
//! and from seekable streams.
//!
//! This crate provides the core functionality for:
//! - Decoding integers, strings and length-prefixed blobs from byte buffers
//! - Turning fixed-layout records into delimited text lines
//! - Bounds-checked reads and chunked substring search over files and
//!   in-memory sources
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`buffer`]: Stateless decoders returning a value and the remainder
//! - [`record`]: Field descriptors, record schemas and the record splitter
//! - [`stream`]: The [`SeekReader`] over files, byte buffers and strings
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use binseek_core::{RecordSchema, RecordSplitter, SeekReader, SplitOptions};
//!
//! // Locate a record block in a large export file
//! let mut reader = SeekReader::from_path("./export.dat")?;
//! let start = reader.index_of(0, b"DATA").expect("no data block");
//! reader.move_to(start + 4)?;
//!
//! // Decode the first record
//! let schema = RecordSchema::parse(["01s17", "02i4", "03s8", "0403"])?;
//! let record = reader.read_bytes(schema.record_len())?;
//! let splitter = RecordSplitter::new(schema, SplitOptions::new().separator("@"))?;
//! println!("{}", splitter.split(&record)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod buffer;
pub mod error;
pub mod record;
pub mod stream;

// Re-export primary types for convenience
pub use buffer::{Endian, IntWidth, LengthPrefix};
pub use error::{Error, Result};
pub use record::{FieldDescriptor, FieldKind, RecordSchema, RecordSplitter, SplitOptions};
pub use stream::{SeekReader, Source, StreamConfig};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
