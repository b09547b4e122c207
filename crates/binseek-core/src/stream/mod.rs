//! Bounds-checked reads and forward search over seekable byte sources.
//!
//! [`SeekReader`] wraps one [`Source`] at a time (a file opened read-only,
//! an owned byte buffer or an owned string) behind a single cursor.
//!
//! ## Lifecycle
//!
//! A reader starts closed. One of the `open_*` methods attaches a source,
//! replacing any previous one; [`SeekReader::close`] detaches it and releases
//! the file handle if there was one. Closing is idempotent. Every read, seek
//! or search on a closed reader fails with [`Error::Closed`].
//!
//! ## Concurrency
//!
//! All operations share the one cursor and take `&mut self`. Callers that
//! need to share a reader across threads must wrap it in their own lock.
//!
//! ## Searching
//!
//! [`SeekReader::index_of`] scans forward in chunks, so sources far larger
//! than memory can be searched:
//!
//! 1. Read up to `max(search_chunk_size, 2 * needle.len())` bytes
//! 2. Return the absolute offset if the needle occurs in the chunk
//! 3. Return "not found" if the chunk ended at end of stream
//! 4. Step back `needle.len() - 1` bytes so matches spanning two chunks are
//!    seen, then continue with the next chunk
//!
//! ```
//! use binseek_core::SeekReader;
//!
//! let mut reader = SeekReader::from_text("xxxSEPxxx");
//! assert_eq!(reader.index_of(0, b"SEP"), Some(3));
//! assert_eq!(reader.index_of(0, b"ZZZ"), None);
//! ```

mod source;

use crate::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};

use source::BoxedSource;
pub use source::Source;

/// Reads above this size are checked against the remaining stream length first
pub const DEFAULT_LARGE_READ_THRESHOLD: usize = 102_400;

/// Minimum number of bytes examined per search step
pub const DEFAULT_SEARCH_CHUNK_SIZE: usize = 20_480;

/// Configuration for a [`SeekReader`]
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Reads larger than this are refused up front when the stream is too short
    pub large_read_threshold: usize,
    /// Lower bound of the search chunk size
    pub search_chunk_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            large_read_threshold: DEFAULT_LARGE_READ_THRESHOLD,
            search_chunk_size: DEFAULT_SEARCH_CHUNK_SIZE,
        }
    }
}

impl StreamConfig {
    /// Creates a new stream config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size above which reads are checked against the stream length
    pub fn large_read_threshold(mut self, bytes: usize) -> Self {
        self.large_read_threshold = bytes;
        self
    }

    /// Sets the minimum search chunk size
    pub fn search_chunk_size(mut self, bytes: usize) -> Self {
        self.search_chunk_size = bytes;
        self
    }
}

/// Cursor-based reader over a file, byte buffer or string
#[derive(Debug, Default)]
pub struct SeekReader {
    source: Option<BoxedSource>,
    config: StreamConfig,
}

impl SeekReader {
    /// Creates a closed reader with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a closed reader with custom configuration
    pub fn with_config(config: StreamConfig) -> Self {
        Self {
            source: None,
            config,
        }
    }

    /// Opens a file read-only
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut reader = Self::new();
        reader.open_path(path)?;
        Ok(reader)
    }

    /// Wraps an in-memory byte buffer
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        let mut reader = Self::new();
        reader.open_bytes(data);
        reader
    }

    /// Wraps an in-memory string
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut reader = Self::new();
        reader.open_text(text);
        reader
    }

    /// The configuration in effect
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Opens a file read-only, replacing the current source
    pub fn open_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let source = BoxedSource::file(path)?;
        debug!("Opened {} for reading", path.display());
        self.attach(source);
        Ok(())
    }

    /// Reads from an in-memory byte buffer, replacing the current source
    pub fn open_bytes(&mut self, data: impl Into<Vec<u8>>) {
        self.attach(BoxedSource::bytes(data.into()));
    }

    /// Reads from an in-memory string, replacing the current source
    pub fn open_text(&mut self, text: impl Into<String>) {
        self.attach(BoxedSource::text(text.into()));
    }

    /// Reads from a caller-provided source, replacing the current source
    pub fn open_source(&mut self, source: impl Source + 'static) {
        self.attach(BoxedSource::custom(source));
    }

    fn attach(&mut self, source: BoxedSource) {
        self.close();
        trace!("Attached {} source", source.describe());
        self.source = Some(source);
    }

    /// Releases the current source. Safe to call on a closed reader.
    pub fn close(&mut self) {
        if let Some(source) = self.source.take() {
            debug!("Closed {} source", source.describe());
        }
    }

    /// Returns true while a source is attached
    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    fn source(&mut self) -> Result<&mut dyn Source> {
        self.source
            .as_mut()
            .map(BoxedSource::inner)
            .ok_or(Error::Closed)
    }

    fn seek(&mut self, target: SeekFrom) -> Result<u64> {
        self.source()?
            .seek(target)
            .map_err(|e| Error::seek(target, e))
    }

    /// Moves the cursor to an absolute offset
    pub fn move_to(&mut self, position: u64) -> Result<u64> {
        self.seek(SeekFrom::Start(position))
    }

    /// Moves the cursor to the end of the stream
    pub fn move_to_end(&mut self) -> Result<u64> {
        self.seek(SeekFrom::End(0))
    }

    /// Moves the cursor relative to its current position
    pub fn move_by(&mut self, delta: i64) -> Result<u64> {
        self.seek(SeekFrom::Current(delta))
    }

    /// Current cursor offset
    pub fn position(&mut self) -> Result<u64> {
        self.seek(SeekFrom::Current(0))
    }

    /// Offset of the end of the stream. Leaves the cursor at the end.
    pub fn end_position(&mut self) -> Result<u64> {
        self.move_to_end()
    }

    /// Stream length as `end_position() + 1`.
    ///
    /// This is one more than the number of bytes in the stream, and the
    /// large-read check in [`read_bytes`](Self::read_bytes) is written
    /// against it. Leaves the cursor at the end.
    pub fn length(&mut self) -> Result<u64> {
        Ok(self.end_position()? + 1)
    }

    /// Reads exactly `n` bytes.
    ///
    /// Fails with [`Error::ShortRead`] if the source runs out first. Reads
    /// above [`StreamConfig::large_read_threshold`] are first compared with
    /// `length() - position()` and refused with
    /// [`Error::InsufficientRemaining`] without reading anything.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if n > self.config.large_read_threshold {
            let position = self.position()?;
            let length = self.length()?;
            self.move_to(position)?;

            let remaining = length.saturating_sub(position);
            if u64::try_from(n).map_or(true, |n| remaining < n) {
                return Err(Error::InsufficientRemaining {
                    requested: n,
                    remaining,
                    position,
                });
            }
        }
        self.read_exact_vec(n)
    }

    fn read_exact_vec(&mut self, n: usize) -> Result<Vec<u8>> {
        let position = self.position()?;
        let source = self.source()?;

        let mut data = Vec::with_capacity(n);
        let read = source
            .take(n as u64)
            .read_to_end(&mut data)
            .map_err(|e| Error::read(position, e))?;

        if read != n {
            return Err(Error::short_read(n, read, position));
        }
        Ok(data)
    }

    /// Reads `n` bytes as text, replacing invalid UTF-8
    pub fn read_string(&mut self, n: usize) -> Result<String> {
        let data = self.read_bytes(n)?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }

    /// Reads `n` bytes as text with surrounding whitespace removed
    pub fn read_string_trimmed(&mut self, n: usize) -> Result<String> {
        Ok(self.read_string(n)?.trim().to_string())
    }

    /// Reads one byte
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_exact_vec(1)?[0])
    }

    /// Reads a little-endian `u16`
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_exact_vec(2)?))
    }

    /// Reads a little-endian `u32`
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_exact_vec(4)?))
    }

    /// Reads a little-endian `u64`
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_exact_vec(8)?))
    }

    /// Reads a big-endian `u16`
    pub fn read_u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(&self.read_exact_vec(2)?))
    }

    /// Reads a big-endian `u32`
    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.read_exact_vec(4)?))
    }

    /// Reads a big-endian `u64`
    pub fn read_u64_be(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(&self.read_exact_vec(8)?))
    }

    /// Finds the first occurrence of `needle` at or after `from`.
    ///
    /// Returns `None` both when the needle is absent and when the source
    /// failed during the search; use [`try_index_of`](Self::try_index_of) to
    /// tell the two apart. The cursor position afterwards is unspecified.
    pub fn index_of(&mut self, from: u64, needle: &[u8]) -> Option<u64> {
        match self.try_index_of(from, needle) {
            Ok(found) => found,
            Err(e) => {
                debug!("Search for {}-byte pattern failed: {}", needle.len(), e);
                None
            }
        }
    }

    /// Like [`index_of`](Self::index_of), but source failures are returned
    /// as errors instead of being reported as "not found".
    pub fn try_index_of(&mut self, from: u64, needle: &[u8]) -> Result<Option<u64>> {
        let end = self.end_position()?;
        self.move_to(from)?;

        if needle.is_empty() {
            return Ok((from <= end).then_some(from));
        }

        let chunk_size = self.config.search_chunk_size.max(needle.len() * 2);
        let overlap = (needle.len() - 1) as i64;

        loop {
            let start = self.position()?;
            let left = end.saturating_sub(start);
            let want = usize::try_from(left).map_or(chunk_size, |left| left.min(chunk_size));

            trace!("Searching {} bytes at offset {}", want, start);
            let chunk = self.read_exact_vec(want)?;

            if let Some(offset) = find_subsequence(&chunk, needle) {
                return Ok(Some(start + offset as u64));
            }

            // Final partial chunk: nothing left to scan
            if want < chunk_size {
                return Ok(None);
            }

            self.move_by(-overlap)?;
        }
    }

    /// Finds the `n`-th occurrence of `needle` at or after `from`.
    ///
    /// Each search resumes right after the end of the previous match, so
    /// occurrences never overlap. On success the cursor is left just past
    /// the returned match. Returns `None` if there are fewer than `n`
    /// occurrences, if `n` is zero, or if the source failed.
    pub fn index_of_nth(&mut self, from: u64, needle: &[u8], n: usize) -> Option<u64> {
        match self.try_index_of_nth(from, needle, n) {
            Ok(found) => found,
            Err(e) => {
                debug!("Search for occurrence {} failed: {}", n, e);
                None
            }
        }
    }

    /// Like [`index_of_nth`](Self::index_of_nth), but a zero `n` and source
    /// failures are returned as errors.
    pub fn try_index_of_nth(&mut self, from: u64, needle: &[u8], n: usize) -> Result<Option<u64>> {
        if n == 0 {
            return Err(Error::InvalidRepeatCount);
        }

        let mut from = from;
        let mut found = None;
        for _ in 0..n {
            let Some(position) = self.try_index_of(from, needle)? else {
                return Ok(None);
            };
            from = position + needle.len() as u64;
            self.move_to(from)?;
            found = Some(position);
        }
        Ok(found)
    }
}

/// Find a subsequence within a byte slice
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ten_bytes() -> SeekReader {
        SeekReader::from_bytes((0u8..10).collect::<Vec<_>>())
    }

    #[test]
    fn test_find_subsequence() {
        let data = b"header.DATA.trailer";
        assert_eq!(find_subsequence(data, b".DATA"), Some(6));
        assert_eq!(find_subsequence(data, b"trailer"), Some(12));
        assert_eq!(find_subsequence(data, b"missing"), None);
    }

    #[test]
    fn test_stream_config_builder() {
        let config = StreamConfig::new()
            .large_read_threshold(16)
            .search_chunk_size(8);

        assert_eq!(config.large_read_threshold, 16);
        assert_eq!(config.search_chunk_size, 8);
        assert_eq!(StreamConfig::default().large_read_threshold, 102_400);
        assert_eq!(StreamConfig::default().search_chunk_size, 20_480);
    }

    #[test]
    fn test_read_past_end_is_short_read() {
        let mut reader = ten_bytes();
        assert_eq!(reader.read_bytes(10).unwrap(), (0u8..10).collect::<Vec<_>>());

        let err = reader.read_bytes(1).unwrap_err();
        assert!(matches!(
            err,
            Error::ShortRead {
                requested: 1,
                read: 0,
                position: 10
            }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_partial_read_is_short_read() {
        let mut reader = ten_bytes();
        reader.move_to(7).unwrap();
        assert!(matches!(
            reader.read_bytes(5),
            Err(Error::ShortRead {
                requested: 5,
                read: 3,
                position: 7
            })
        ));
    }

    #[test]
    fn test_length_is_end_plus_one() {
        let mut reader = ten_bytes();
        assert_eq!(reader.end_position().unwrap(), 10);
        assert_eq!(reader.length().unwrap(), 11);
        assert_eq!(reader.position().unwrap(), 10);
    }

    #[test]
    fn test_large_read_preflight() {
        let mut reader = SeekReader::with_config(StreamConfig::new().large_read_threshold(4));
        reader.open_bytes((0u8..10).collect::<Vec<_>>());
        reader.move_to(5).unwrap();

        let err = reader.read_bytes(8).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientRemaining {
                requested: 8,
                remaining: 6,
                position: 5
            }
        ));
        assert_eq!(reader.position().unwrap(), 5);

        // passes the length check (length is end + 1) but the read itself is short
        assert!(matches!(
            reader.read_bytes(6),
            Err(Error::ShortRead {
                requested: 6,
                read: 5,
                ..
            })
        ));
    }

    #[test]
    fn test_oversized_read_is_refused() {
        let mut reader = ten_bytes();
        reader.move_to(2).unwrap();
        assert!(matches!(
            reader.read_bytes(usize::MAX),
            Err(Error::InsufficientRemaining {
                requested: usize::MAX,
                remaining: 9,
                position: 2
            })
        ));
        assert_eq!(reader.position().unwrap(), 2);
    }

    #[test]
    fn test_seek_operations() {
        let mut reader = ten_bytes();
        assert_eq!(reader.move_to(4).unwrap(), 4);
        assert_eq!(reader.move_by(3).unwrap(), 7);
        assert_eq!(reader.move_by(-2).unwrap(), 5);
        assert_eq!(reader.read_u8().unwrap(), 5);
        assert_eq!(reader.move_to_end().unwrap(), 10);
        assert!(matches!(reader.move_by(-20), Err(Error::Seek { .. })));
    }

    #[test]
    fn test_integer_reads() {
        let mut data = Vec::new();
        data.extend_from_slice(&0xBEEFu16.to_le_bytes());
        data.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        data.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
        data.extend_from_slice(&0xCAFEu16.to_be_bytes());
        data.extend_from_slice(&7u32.to_be_bytes());
        data.extend_from_slice(&9u64.to_be_bytes());
        let mut reader = SeekReader::from_bytes(data);

        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_u64().unwrap(), 0x0102_0304_0506_0708);
        assert_eq!(reader.read_u16_be().unwrap(), 0xCAFE);
        assert_eq!(reader.read_u32_be().unwrap(), 7);
        assert_eq!(reader.read_u64_be().unwrap(), 9);
        assert!(matches!(reader.read_u16(), Err(Error::ShortRead { .. })));
    }

    #[test]
    fn test_short_integer_read() {
        let mut reader = SeekReader::from_bytes(vec![1, 2, 3]);
        assert!(matches!(
            reader.read_u32(),
            Err(Error::ShortRead {
                requested: 4,
                read: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_read_strings() {
        let mut reader = SeekReader::from_text("  padded  tail");
        assert_eq!(reader.read_string_trimmed(10).unwrap(), "padded");
        reader.move_to(0).unwrap();
        assert_eq!(reader.read_string(10).unwrap(), "  padded  ");
        assert_eq!(reader.read_string(4).unwrap(), "tail");
    }

    #[test]
    fn test_index_of() {
        let mut reader = SeekReader::from_text("xxxSEPxxx");
        assert_eq!(reader.index_of(0, b"SEP"), Some(3));
        assert_eq!(reader.index_of(0, b"ZZZ"), None);
        assert_eq!(reader.index_of(4, b"SEP"), None);
        assert_eq!(reader.index_of(0, b"xxx"), Some(0));
    }

    #[test]
    fn test_index_of_across_chunk_boundary() {
        let mut reader = SeekReader::with_config(StreamConfig::new().search_chunk_size(4));
        // chunk size becomes 6; "SEP" starts inside the first chunk and ends in the second
        reader.open_text("abcdSEPxyzzz");
        assert_eq!(reader.index_of(0, b"SEP"), Some(4));

        reader.open_text("abcdefghijklmnopqrstuvwSEP");
        assert_eq!(reader.index_of(0, b"SEP"), Some(23));
        assert_eq!(reader.index_of(0, b"SEQ"), None);
    }

    #[test]
    fn test_index_of_nth() {
        let mut reader = SeekReader::from_text("aXbXcX");
        assert_eq!(reader.index_of_nth(0, b"X", 1), Some(1));
        assert_eq!(reader.index_of_nth(0, b"X", 2), Some(3));
        assert_eq!(reader.position().unwrap(), 4);
        assert_eq!(reader.index_of_nth(0, b"X", 3), Some(5));
        assert_eq!(reader.index_of_nth(0, b"X", 4), None);
    }

    #[test]
    fn test_index_of_nth_does_not_overlap() {
        let mut reader = SeekReader::from_text("aaaa");
        assert_eq!(reader.index_of_nth(0, b"aa", 2), Some(2));
        assert_eq!(reader.index_of_nth(0, b"aa", 3), None);
    }

    #[test]
    fn test_index_of_nth_rejects_zero() {
        let mut reader = SeekReader::from_text("aXbX");
        assert_eq!(reader.index_of_nth(0, b"X", 0), None);
        assert!(matches!(
            reader.try_index_of_nth(0, b"X", 0),
            Err(Error::InvalidRepeatCount)
        ));
    }

    #[test]
    fn test_search_on_closed_reader() {
        let mut reader = SeekReader::new();
        assert_eq!(reader.index_of(0, b"X"), None);
        assert!(matches!(reader.try_index_of(0, b"X"), Err(Error::Closed)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut reader = SeekReader::new();
        reader.close();
        assert!(!reader.is_open());

        reader.open_bytes(vec![1, 2, 3]);
        assert!(reader.is_open());
        reader.close();
        reader.close();
        assert!(!reader.is_open());
        assert!(matches!(reader.read_bytes(1), Err(Error::Closed)));
    }

    #[test]
    fn test_reopen_replaces_source() {
        let mut reader = SeekReader::from_text("first");
        reader.open_bytes(b"second".to_vec());
        assert_eq!(reader.read_string(6).unwrap(), "second");
    }

    #[test]
    fn test_file_source() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"header\x2A\x00\x00\x00MARKtrailer").unwrap();
        file.flush().unwrap();

        let mut reader = SeekReader::from_path(file.path()).unwrap();
        assert_eq!(reader.read_string(6).unwrap(), "header");
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.index_of(0, b"MARK"), Some(10));
        assert_eq!(reader.length().unwrap(), 22);
        reader.close();
        reader.close();
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SeekReader::from_path(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, Error::Open { .. }));
        assert!(err.to_string().contains("missing.bin"));
    }
}
