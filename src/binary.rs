//! Bounds-checked byte cursor for reading MVD2 command streams.
//!
//! [`ByteCursor`] wraps a byte slice and a read position. Every read
//! advances the position by the width of the field it consumed, and any
//! read that would run past the end of the slice fails with
//! [`ParserError::UnexpectedEof`] without moving the cursor or returning
//! partial data.
//!
//! # Endianness
//!
//! All multi-byte integers in the MVD2 protocol are little-endian.
//!
//! # Example
//!
//! ```
//! use mvd2_parser::binary::ByteCursor;
//!
//! let data = [0x25, 0x00, 0x00, 0x00, b'H', b'i', 0x00];
//! let mut cursor = ByteCursor::new(&data);
//!
//! assert_eq!(cursor.read_u32().unwrap(), 37);
//! assert_eq!(cursor.read_string().unwrap(), "Hi");
//! assert_eq!(cursor.remaining(), 0);
//! ```

use crate::error::{ParserError, Result};

/// A position-tracking reader over a borrowed byte buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a cursor positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Returns the current read position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Returns whether every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes remain.
    ///
    /// # Example
    ///
    /// ```
    /// use mvd2_parser::binary::ByteCursor;
    ///
    /// let mut cursor = ByteCursor::new(b"MVD2\x00\x00");
    /// assert_eq!(cursor.read_bytes(4).unwrap(), b"MVD2");
    /// assert!(cursor.read_bytes(3).is_err());
    /// assert_eq!(cursor.position(), 4);
    /// ```
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                ParserError::unexpected_eof(self.position.saturating_add(len), self.data.len())
            })?;

        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }

    /// Reads a fixed-size array of bytes.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Skips `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` at the end of the buffer.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` at the end of the buffer.
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian u16.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian i16.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 2 bytes remain.
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian u32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Reads a little-endian i32.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// Reads a null-terminated string and advances past the terminator.
    ///
    /// A string missing its terminator runs to the end of the buffer, which
    /// leaves the cursor empty. Bytes that are not valid UTF-8 are replaced
    /// with U+FFFD rather than failing the read.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the cursor is already at the
    /// end of the buffer.
    ///
    /// # Example
    ///
    /// ```
    /// use mvd2_parser::binary::ByteCursor;
    ///
    /// let mut cursor = ByteCursor::new(b"caf\xE9\x00rest");
    /// assert_eq!(cursor.read_string().unwrap(), "caf\u{FFFD}");
    /// assert_eq!(cursor.remaining(), 4);
    /// ```
    pub fn read_string(&mut self) -> Result<String> {
        let rest = &self.data[self.position..];
        if rest.is_empty() {
            return Err(ParserError::unexpected_eof(
                self.data.len() + 1,
                self.data.len(),
            ));
        }

        let (text, consumed) = match rest.iter().position(|&b| b == 0) {
            Some(len) => (&rest[..len], len + 1),
            None => (rest, rest.len()),
        };
        self.position += consumed;
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// Reads a blob prefixed with a single length byte.
    ///
    /// A zero length yields an empty slice.
    ///
    /// # Errors
    ///
    /// Returns `ParserError::UnexpectedEof` if the length byte or the blob
    /// itself runs past the end of the buffer.
    pub fn read_blob(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u8()?;
        self.read_bytes(usize::from(len))
    }
}
