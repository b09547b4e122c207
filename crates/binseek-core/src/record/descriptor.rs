//! Field descriptors for fixed-layout records.
//!
//! A descriptor is a short code `OOKL...`:
//! - `OO`: two-digit ordinal, only there to keep long schemas readable
//! - `K`: `s` (text), `i` (unsigned little-endian integer) or `0` (skip)
//! - `L...`: decimal byte length; for `i` it must be 1, 2, 4 or 8
//!
//! Descriptors are parsed once into a [`RecordSchema`], so a malformed code
//! is reported when the schema is built, not halfway through a record.

use crate::buffer::IntWidth;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// What a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bytes are consumed and discarded
    Skip,
    /// Bytes are decoded as text
    Text,
    /// Bytes are a little-endian unsigned integer
    Unsigned(IntWidth),
}

/// One parsed field descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field kind
    pub kind: FieldKind,
    /// Byte length of the field
    pub len: usize,
}

impl FieldDescriptor {
    /// A discarded field of `len` bytes
    pub fn skip(len: usize) -> Self {
        Self {
            kind: FieldKind::Skip,
            len,
        }
    }

    /// A text field of `len` bytes
    pub fn text(len: usize) -> Self {
        Self {
            kind: FieldKind::Text,
            len,
        }
    }

    /// An unsigned integer field
    pub fn unsigned(width: IntWidth) -> Self {
        Self {
            kind: FieldKind::Unsigned(width),
            len: width.bytes(),
        }
    }

    /// Returns true if this field produces an output token
    pub fn is_emitted(&self) -> bool {
        self.kind != FieldKind::Skip
    }
}

impl FromStr for FieldDescriptor {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        if !code.is_ascii() || code.len() < 4 {
            return Err(Error::invalid_descriptor(
                code,
                "expected two ordinal digits, a kind and a length",
            ));
        }

        let kind = &code[2..3];
        let len: usize = code[3..].parse().map_err(|_| {
            Error::invalid_descriptor(code, format!("length '{}' is not a number", &code[3..]))
        })?;

        let kind = match kind {
            "0" => FieldKind::Skip,
            "s" => FieldKind::Text,
            "i" => match IntWidth::from_bytes(len) {
                Some(width) => FieldKind::Unsigned(width),
                None => {
                    return Err(Error::invalid_descriptor(
                        code,
                        format!("integer length must be 1, 2, 4 or 8, got {}", len),
                    ))
                }
            },
            other => {
                return Err(Error::invalid_descriptor(
                    code,
                    format!("kind must be one of 's', 'i', '0', got '{}'", other),
                ))
            }
        };

        Ok(Self { kind, len })
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            FieldKind::Skip => '0',
            FieldKind::Text => 's',
            FieldKind::Unsigned(_) => 'i',
        };
        write!(f, "{}{}", kind, self.len)
    }
}

/// Ordered list of fields covering one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSchema {
    fields: Vec<FieldDescriptor>,
    record_len: usize,
}

impl RecordSchema {
    /// Creates a schema from already-parsed fields. Fails if the field
    /// lengths add up to more than `usize::MAX`.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self> {
        let mut record_len: usize = 0;
        for field in &fields {
            record_len = record_len.checked_add(field.len).ok_or_else(|| {
                Error::invalid_descriptor(field.to_string(), "total record length overflows")
            })?;
        }
        Ok(Self { fields, record_len })
    }

    /// Parses a list of descriptor codes such as `["01s17", "02i4", "0403"]`
    pub fn parse<I, S>(codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = codes
            .into_iter()
            .map(|code| code.as_ref().trim().parse::<FieldDescriptor>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    /// Parses a comma-separated descriptor list, e.g. `01s17,02i4,0403`
    pub fn parse_list(list: &str) -> Result<Self> {
        Self::parse(list.split(',').filter(|code| !code.trim().is_empty()))
    }

    /// The fields in record order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Total number of bytes a matching record must have
    pub fn record_len(&self) -> usize {
        self.record_len
    }

    /// Number of tokens produced per record
    pub fn token_count(&self) -> usize {
        self.fields.iter().filter(|field| field.is_emitted()).count()
    }
}

impl FromStr for RecordSchema {
    type Err = Error;

    fn from_str(list: &str) -> Result<Self> {
        Self::parse_list(list)
    }
}
