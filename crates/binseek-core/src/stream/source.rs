//! Byte sources a [`SeekReader`](super::SeekReader) can sit on.

use crate::error::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

/// Anything that can be read from and repositioned.
///
/// Files and cursors over owned bytes or text implement it out of the box;
/// any other `Read + Seek` type opts in with an empty `impl`.
pub trait Source: Read + Seek {
    /// Short description of the source used in log output
    fn describe(&self) -> &'static str {
        "reader"
    }
}

impl Source for File {
    fn describe(&self) -> &'static str {
        "file"
    }
}

impl Source for Cursor<Vec<u8>> {
    fn describe(&self) -> &'static str {
        "bytes"
    }
}

impl Source for Cursor<String> {
    fn describe(&self) -> &'static str {
        "text"
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn describe(&self) -> &'static str {
        (**self).describe()
    }
}

/// Owned, type-erased source
pub(crate) struct BoxedSource(Box<dyn Source>);

impl BoxedSource {
    pub(crate) fn file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::open(path, e))?;
        Ok(Self(Box::new(file)))
    }

    pub(crate) fn bytes(data: Vec<u8>) -> Self {
        Self(Box::new(Cursor::new(data)))
    }

    pub(crate) fn text(text: String) -> Self {
        Self(Box::new(Cursor::new(text)))
    }

    pub(crate) fn custom(source: impl Source + 'static) -> Self {
        Self(Box::new(source))
    }

    pub(crate) fn inner(&mut self) -> &mut dyn Source {
        self.0.as_mut()
    }

    pub(crate) fn describe(&self) -> &'static str {
        self.0.describe()
    }
}

impl fmt::Debug for BoxedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoxedSource").field(&self.describe()).finish()
    }
}
