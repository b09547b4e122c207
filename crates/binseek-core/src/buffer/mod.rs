//! Cursor-style decoding of primitive values from byte buffers.
//!
//! Every function takes a buffer, decodes one value from its front and
//! returns that value together with the unconsumed remainder. The remainder
//! borrows from the input, so a chain of decodes never copies the buffer:
//!
//! ```
//! use binseek_core::buffer::{take_string, take_u16_le, take_u8};
//!
//! let record = [0x03, b'a', b'b', b'c', 0x2A, 0x00];
//! let (len, rest) = take_u8(&record);
//! let (name, rest) = take_string(rest, len as usize);
//! let (count, rest) = take_u16_le(rest);
//!
//! assert_eq!(name, "abc");
//! assert_eq!(count, 42);
//! assert!(rest.is_empty());
//! ```
//!
//! ## Preconditions
//!
//! Callers are expected to know the layout they are decoding. Asking for more
//! bytes than the buffer holds is a programming error, and every function
//! panics with a "buffer underrun" message rather than truncating.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::borrow::Cow;

/// Width of a fixed-size unsigned integer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IntWidth {
    /// 1 byte
    U8 = 1,
    /// 2 bytes
    U16 = 2,
    /// 4 bytes
    U32 = 4,
    /// 8 bytes
    U64 = 8,
}

impl IntWidth {
    /// Number of bytes occupied by an integer of this width
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Maps a byte count onto a width, if it is one of 1, 2, 4 or 8
    pub fn from_bytes(len: usize) -> Option<Self> {
        match len {
            1 => Some(Self::U8),
            2 => Some(Self::U16),
            4 => Some(Self::U32),
            8 => Some(Self::U64),
            _ => None,
        }
    }
}

/// Byte order of a multi-byte integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

/// Encoding of the length that precedes a length-prefixed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPrefix {
    /// Width of the prefix integer
    pub width: IntWidth,
    /// Byte order of the prefix integer
    pub endian: Endian,
}

impl LengthPrefix {
    /// Creates a prefix description
    pub const fn new(width: IntWidth, endian: Endian) -> Self {
        Self { width, endian }
    }

    /// Single length byte
    pub const U8: Self = Self::new(IntWidth::U8, Endian::Little);
    /// Little-endian 16-bit length
    pub const U16_LE: Self = Self::new(IntWidth::U16, Endian::Little);
    /// Big-endian 16-bit length
    pub const U16_BE: Self = Self::new(IntWidth::U16, Endian::Big);
    /// Little-endian 32-bit length
    pub const U32_LE: Self = Self::new(IntWidth::U32, Endian::Little);
    /// Big-endian 32-bit length
    pub const U32_BE: Self = Self::new(IntWidth::U32, Endian::Big);
    /// Little-endian 64-bit length
    pub const U64_LE: Self = Self::new(IntWidth::U64, Endian::Little);
    /// Big-endian 64-bit length
    pub const U64_BE: Self = Self::new(IntWidth::U64, Endian::Big);
}

/// Split off the first `n` bytes.
///
/// # Panics
///
/// Panics if `n` is larger than `data.len()`.
pub fn take_bytes(data: &[u8], n: usize) -> (&[u8], &[u8]) {
    assert!(
        n <= data.len(),
        "buffer underrun: need {} bytes, {} remaining",
        n,
        data.len()
    );
    data.split_at(n)
}

/// Decode the first `n` bytes as text. Invalid UTF-8 is replaced, and the
/// value borrows from `data` whenever the bytes are already valid.
///
/// # Panics
///
/// Panics if `n` is larger than `data.len()`.
pub fn take_string(data: &[u8], n: usize) -> (Cow<'_, str>, &[u8]) {
    let (head, rest) = take_bytes(data, n);
    (String::from_utf8_lossy(head), rest)
}

/// Render the first `n` bytes as uppercase hexadecimal.
///
/// # Panics
///
/// Panics if `n` is larger than `data.len()`.
pub fn take_hex_upper(data: &[u8], n: usize) -> (String, &[u8]) {
    let (head, rest) = take_bytes(data, n);
    (hex::encode_upper(head), rest)
}

/// Read one byte.
///
/// # Panics
///
/// Panics if `data` is empty.
pub fn take_u8(data: &[u8]) -> (u8, &[u8]) {
    let (head, rest) = take_bytes(data, 1);
    (head[0], rest)
}

macro_rules! take_fixed {
    ($(#[$doc:meta] $name:ident, $ty:ty, $order:ty, $read:ident;)*) => {
        $(
            #[$doc]
            ///
            /// # Panics
            ///
            /// Panics if `data` is shorter than the integer width.
            pub fn $name(data: &[u8]) -> ($ty, &[u8]) {
                let (head, rest) = take_bytes(data, std::mem::size_of::<$ty>());
                (<$order>::$read(head), rest)
            }
        )*
    };
}

take_fixed! {
    /// Read a little-endian `u16`.
    take_u16_le, u16, LittleEndian, read_u16;
    /// Read a big-endian `u16`.
    take_u16_be, u16, BigEndian, read_u16;
    /// Read a little-endian `u32`.
    take_u32_le, u32, LittleEndian, read_u32;
    /// Read a big-endian `u32`.
    take_u32_be, u32, BigEndian, read_u32;
    /// Read a little-endian `u64`.
    take_u64_le, u64, LittleEndian, read_u64;
    /// Read a big-endian `u64`.
    take_u64_be, u64, BigEndian, read_u64;
}

/// Read an unsigned integer whose width and byte order are chosen at runtime,
/// widened to `u64`.
///
/// # Panics
///
/// Panics if `data` is shorter than `width`.
pub fn take_uint(data: &[u8], width: IntWidth, endian: Endian) -> (u64, &[u8]) {
    match (width, endian) {
        (IntWidth::U8, _) => {
            let (v, rest) = take_u8(data);
            (u64::from(v), rest)
        }
        (IntWidth::U16, Endian::Little) => {
            let (v, rest) = take_u16_le(data);
            (u64::from(v), rest)
        }
        (IntWidth::U16, Endian::Big) => {
            let (v, rest) = take_u16_be(data);
            (u64::from(v), rest)
        }
        (IntWidth::U32, Endian::Little) => {
            let (v, rest) = take_u32_le(data);
            (u64::from(v), rest)
        }
        (IntWidth::U32, Endian::Big) => {
            let (v, rest) = take_u32_be(data);
            (u64::from(v), rest)
        }
        (IntWidth::U64, Endian::Little) => take_u64_le(data),
        (IntWidth::U64, Endian::Big) => take_u64_be(data),
    }
}

/// Read a length prefix, then that many bytes.
///
/// # Panics
///
/// Panics if the prefix or the payload it announces runs past the end of `data`.
pub fn take_bytes_prefixed(data: &[u8], prefix: LengthPrefix) -> (&[u8], &[u8]) {
    let (len, rest) = take_uint(data, prefix.width, prefix.endian);
    take_bytes(rest, prefix_len(len, rest.len()))
}

/// Read a length prefix, then that many bytes as text.
///
/// # Panics
///
/// Panics if the prefix or the payload it announces runs past the end of `data`.
pub fn take_string_prefixed(data: &[u8], prefix: LengthPrefix) -> (Cow<'_, str>, &[u8]) {
    let (len, rest) = take_uint(data, prefix.width, prefix.endian);
    take_string(rest, prefix_len(len, rest.len()))
}

fn prefix_len(len: u64, remaining: usize) -> usize {
    match usize::try_from(len) {
        Ok(n) => n,
        Err(_) => panic!(
            "buffer underrun: need {} bytes, {} remaining",
            len, remaining
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_take_bytes_splits_buffer() {
        let data = b"hello world";
        for n in [0, 1, 5, data.len()] {
            let (head, rest) = take_bytes(data, n);
            assert_eq!(head.len(), n);
            assert_eq!(rest.len(), data.len() - n);
            assert_eq!([head, rest].concat(), data.to_vec());
        }
    }

    #[test]
    fn test_remainder_borrows_input() {
        let data = [1u8, 2, 3, 4];
        let (_, rest) = take_u16_le(&data);
        assert_eq!(rest.as_ptr(), data[2..].as_ptr());
    }

    #[test]
    #[should_panic(expected = "buffer underrun")]
    fn test_take_bytes_underrun() {
        take_bytes(b"abc", 4);
    }

    #[test]
    #[should_panic(expected = "buffer underrun")]
    fn test_take_u32_underrun() {
        take_u32_le(&[1, 2, 3]);
    }

    #[test]
    fn test_fixed_width_integers() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xFF];

        assert_eq!(take_u8(&data).0, 0x01);
        assert_eq!(take_u16_le(&data).0, 0x0201);
        assert_eq!(take_u16_be(&data).0, 0x0102);
        assert_eq!(take_u32_le(&data).0, 0x0403_0201);
        assert_eq!(take_u32_be(&data).0, 0x0102_0304);
        assert_eq!(take_u64_le(&data).0, 0x0807_0605_0403_0201);
        assert_eq!(take_u64_be(&data).0, 0x0102_0304_0506_0708);
        assert_eq!(take_u64_be(&data).1, &[0xFF]);
    }

    #[test]
    fn test_integers_reencode_to_prefix() {
        let data = [0xFE, 0xCA, 0xEF, 0xBE, 0xAD, 0xDE, 0x00, 0x80, 0x11];

        assert_eq!(take_u16_le(&data).0.to_le_bytes(), data[..2]);
        assert_eq!(take_u16_be(&data).0.to_be_bytes(), data[..2]);
        assert_eq!(take_u32_le(&data).0.to_le_bytes(), data[..4]);
        assert_eq!(take_u32_be(&data).0.to_be_bytes(), data[..4]);
        assert_eq!(take_u64_le(&data).0.to_le_bytes(), data[..8]);
        assert_eq!(take_u64_be(&data).0.to_be_bytes(), data[..8]);
    }

    #[test]
    fn test_take_uint_matches_fixed_functions() {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50, 0x60, 0x70, 0x80];

        assert_eq!(take_uint(&data, IntWidth::U8, Endian::Big).0, 0x10);
        assert_eq!(
            take_uint(&data, IntWidth::U16, Endian::Big).0,
            u64::from(take_u16_be(&data).0)
        );
        assert_eq!(
            take_uint(&data, IntWidth::U32, Endian::Little).0,
            u64::from(take_u32_le(&data).0)
        );
        assert_eq!(take_uint(&data, IntWidth::U64, Endian::Big).1.len(), 0);
    }

    #[test]
    fn test_take_string_keeps_spaces() {
        let (text, rest) = take_string(b"ab  cd", 4);
        assert_eq!(text, "ab  ");
        assert_eq!(rest, b"cd");
        assert!(matches!(text, Cow::Borrowed(_)));
    }

    #[test]
    fn test_take_hex_upper() {
        let (hex, rest) = take_hex_upper(&[0xDE, 0xAD, 0xbe, 0x01], 3);
        assert_eq!(hex, "DEADBE");
        assert_eq!(rest, &[0x01]);
    }

    #[test]
    fn test_prefixed_fields() {
        // big-endian u16 length 3, then "abc", then a trailing byte
        let data = [0x00, 0x03, b'a', b'b', b'c', 0x09];
        let (payload, rest) = take_bytes_prefixed(&data, LengthPrefix::U16_BE);
        assert_eq!(payload, b"abc");
        assert_eq!(rest, &[0x09]);

        let data = [0x02, b'h', b'i'];
        let (text, rest) = take_string_prefixed(&data, LengthPrefix::U8);
        assert_eq!(text, "hi");
        assert!(rest.is_empty());

        let mut data = 4u64.to_le_bytes().to_vec();
        data.extend_from_slice(b"wxyz");
        let (text, _) = take_string_prefixed(&data, LengthPrefix::U64_LE);
        assert_eq!(text, "wxyz");
    }

    #[test]
    #[should_panic(expected = "buffer underrun")]
    fn test_prefixed_length_exceeds_buffer() {
        take_bytes_prefixed(&[0x05, b'a', b'b'], LengthPrefix::U8);
    }

    #[test]
    fn test_int_width_from_bytes() {
        assert_eq!(IntWidth::from_bytes(4), Some(IntWidth::U32));
        assert_eq!(IntWidth::from_bytes(3), None);
        assert_eq!(IntWidth::U64.bytes(), 8);
    }
}
