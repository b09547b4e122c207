//! Error types for the binseek-core library.
//!
//! Errors fall into two classes. Stream failures (open, seek, read, short
//! reads) are runtime conditions the caller is expected to branch on. Schema
//! failures (malformed field descriptors, separator collisions, records that
//! do not match their schema) mean the record layout itself was authored
//! wrong; they are returned rather than aborting the process, but retrying
//! will never make them succeed. [`Error::is_recoverable`] tells them apart.

use std::io::SeekFrom;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for binseek operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all binseek operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The reader has no open source
    #[error("stream is closed")]
    Closed,

    /// Failed to open a file as a stream source
    #[error("failed to open '{path}': {source}")]
    Open {
        /// Path to the file that failed to open
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The underlying source rejected a seek
    #[error("failed to seek to {target:?}: {source}")]
    Seek {
        /// Requested seek target
        target: SeekFrom,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The underlying source failed while reading
    #[error("read failed at offset {position}: {source}")]
    Read {
        /// Cursor position when the read started
        position: u64,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Fewer bytes were available than requested
    #[error("short read at offset {position}: requested {requested} bytes, got {read}")]
    ShortRead {
        /// Number of bytes asked for
        requested: usize,
        /// Number of bytes actually read
        read: usize,
        /// Cursor position when the read started
        position: u64,
    },

    /// A large read was refused before touching the source
    #[error(
        "{requested} bytes is too long for this stream, only {remaining} bytes left at offset {position}"
    )]
    InsufficientRemaining {
        /// Number of bytes asked for
        requested: usize,
        /// Bytes left according to the stream length
        remaining: u64,
        /// Cursor position when the read was attempted
        position: u64,
    },

    /// Repeat count for an n-th occurrence search must be positive
    #[error("occurrence count must be at least 1")]
    InvalidRepeatCount,

    /// Record separator was empty
    #[error("record separator must not be empty")]
    EmptySeparator,

    /// Malformed field descriptor
    #[error("invalid field descriptor '{descriptor}': {reason}")]
    InvalidDescriptor {
        /// The descriptor text as written
        descriptor: String,
        /// What is wrong with it
        reason: String,
    },

    /// A decoded token contains the separator
    #[error("field {field} value '{token}' contains the record separator")]
    SeparatorCollision {
        /// Zero-based index of the offending descriptor
        field: usize,
        /// The decoded token
        token: String,
    },

    /// Record length and schema length disagree
    #[error("record is {actual} bytes but the schema describes {expected} bytes")]
    LengthMismatch {
        /// Bytes covered by the schema
        expected: usize,
        /// Bytes in the record
        actual: usize,
    },
}

impl Error {
    /// Creates a new open error
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a new seek error
    pub fn seek(target: SeekFrom, source: std::io::Error) -> Self {
        Self::Seek { target, source }
    }

    /// Creates a new read error
    pub fn read(position: u64, source: std::io::Error) -> Self {
        Self::Read { position, source }
    }

    /// Creates a new short read error
    pub fn short_read(requested: usize, read: usize, position: u64) -> Self {
        Self::ShortRead {
            requested,
            read,
            position,
        }
    }

    /// Creates a new invalid descriptor error
    pub fn invalid_descriptor(descriptor: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            descriptor: descriptor.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for stream failures the caller may retry or work around,
    /// false for schema errors that indicate a wrongly authored record layout
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Closed
                | Self::Open { .. }
                | Self::Seek { .. }
                | Self::Read { .. }
                | Self::ShortRead { .. }
                | Self::InsufficientRemaining { .. }
        )
    }
}
