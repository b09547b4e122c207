//! Splitting fixed-layout binary records into delimited text.
//!
//! A [`RecordSchema`] describes a record field by field; [`RecordSplitter`]
//! walks a record with the [`buffer`](crate::buffer) decoders and joins the
//! resulting tokens with a separator.
//!
//! ```
//! use binseek_core::{RecordSchema, RecordSplitter, SplitOptions};
//!
//! let schema = RecordSchema::parse(["01s4", "02i2"])?;
//! let splitter = RecordSplitter::new(schema, SplitOptions::new().separator("@"))?;
//!
//! let mut record = b"AB12".to_vec();
//! record.extend_from_slice(&7u16.to_le_bytes());
//! assert_eq!(splitter.split(&record)?, "AB12@7");
//! # Ok::<(), binseek_core::Error>(())
//! ```

pub mod descriptor;

use crate::buffer::{take_bytes, take_uint, Endian};
use crate::error::{Error, Result};
use encoding_rs::Encoding;
use std::borrow::Cow;
use tracing::trace;

pub use descriptor::{FieldDescriptor, FieldKind, RecordSchema};

/// Options for the record splitter
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Token separator
    pub separator: String,
    /// Strip trailing spaces from text fields
    pub trim_right: bool,
    /// Encoding of text fields
    pub encoding: &'static Encoding,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            separator: "@".to_string(),
            trim_right: false,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl SplitOptions {
    /// Creates options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the token separator
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Enables or disables trimming of trailing spaces in text fields
    pub fn trim_right(mut self, trim: bool) -> Self {
        self.trim_right = trim;
        self
    }

    /// Sets the text encoding, e.g. `encoding_rs::GBK` for legacy exports
    pub fn encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Turns records matching a schema into separator-joined lines
#[derive(Debug, Clone)]
pub struct RecordSplitter {
    schema: RecordSchema,
    options: SplitOptions,
}

impl RecordSplitter {
    /// Creates a splitter. Fails if the separator is empty.
    pub fn new(schema: RecordSchema, options: SplitOptions) -> Result<Self> {
        if options.separator.is_empty() {
            return Err(Error::EmptySeparator);
        }
        Ok(Self { schema, options })
    }

    /// The schema records are decoded with
    pub fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    /// The options in effect
    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    /// Decodes one record into a delimited line.
    ///
    /// The record must be exactly [`RecordSchema::record_len`] bytes long,
    /// and no decoded token may contain the separator.
    pub fn split(&self, record: &[u8]) -> Result<String> {
        let expected = self.schema.record_len();
        if record.len() < expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: record.len(),
            });
        }

        let separator = self.options.separator.as_str();
        let mut tokens: Vec<Cow<'_, str>> = Vec::with_capacity(self.schema.token_count());
        let mut data = record;

        for (index, field) in self.schema.fields().iter().enumerate() {
            let (bytes, rest) = take_bytes(data, field.len);
            data = rest;

            let token = match field.kind {
                FieldKind::Skip => continue,
                FieldKind::Text => self.decode_text(bytes),
                FieldKind::Unsigned(width) => {
                    Cow::Owned(take_uint(bytes, width, Endian::Little).0.to_string())
                }
            };

            if token.contains(separator) {
                trace!("Field {} collides with separator {:?}", index, separator);
                return Err(Error::SeparatorCollision {
                    field: index,
                    token: token.into_owned(),
                });
            }

            let token = if self.options.trim_right {
                trim_trailing_spaces(token)
            } else {
                token
            };
            tokens.push(token);
        }

        if !data.is_empty() {
            return Err(Error::LengthMismatch {
                expected,
                actual: record.len(),
            });
        }

        Ok(tokens.join(separator))
    }

    /// Splits a buffer holding consecutive records and returns one line per
    /// record. The buffer length must be a multiple of the record length.
    pub fn split_all(&self, data: &[u8]) -> Result<Vec<String>> {
        let record_len = self.schema.record_len();
        if record_len == 0 {
            return if data.is_empty() {
                Ok(Vec::new())
            } else {
                Err(Error::LengthMismatch {
                    expected: 0,
                    actual: data.len(),
                })
            };
        }
        if data.len() % record_len != 0 {
            return Err(Error::LengthMismatch {
                expected: (data.len() / record_len * record_len).saturating_add(record_len),
                actual: data.len(),
            });
        }

        data.chunks_exact(record_len)
            .map(|record| self.split(record))
            .collect()
    }

    fn decode_text<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, _) = self.options.encoding.decode_without_bom_handling(bytes);
        text
    }
}

fn trim_trailing_spaces(token: Cow<'_, str>) -> Cow<'_, str> {
    match token {
        Cow::Borrowed(s) => Cow::Borrowed(s.trim_end_matches(' ')),
        Cow::Owned(s) => Cow::Owned(s.trim_end_matches(' ').to_string()),
    }
}
