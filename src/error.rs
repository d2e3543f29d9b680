//! Error types for the MVD2 demo parser.
//!
//! Errors fall into two groups:
//!
//! - **Fatal** errors stop a parse before any result exists: a missing or
//!   wrong magic tag, or a gzip container that yields no bytes at all.
//! - **Recoverable** errors describe a single bad record: a read past the
//!   end of a block, an unknown opcode, or an out-of-range config-string
//!   index. The dispatcher catches these at the block boundary, drops the
//!   rest of that block and carries on with the next one.
//!
//! Only fatal errors (and I/O errors from the file loader) ever reach the
//! caller of [`crate::parse`].

use thiserror::Error;

/// The main error type for MVD2 parsing operations.
///
/// # Example
///
/// ```
/// use mvd2_parser::error::{ParserError, Result};
///
/// fn example_operation() -> Result<()> {
///     Err(ParserError::DecompressionError {
///         reason: "empty archive".to_string(),
///     })
/// }
/// ```
#[derive(Error, Debug)]
pub enum ParserError {
    /// An I/O error occurred while reading the capture file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The (decompressed) capture does not begin with the `MVD2` tag.
    #[error("Invalid magic bytes: expected {expected}, found {found}")]
    InvalidMagic {
        /// The expected magic bytes (as hex string for display).
        expected: String,
        /// The actual bytes found at the start of the data (as hex string).
        found: String,
    },

    /// A gzip container produced no usable bytes.
    #[error("Decompression failed: {reason}")]
    DecompressionError {
        /// A description of the decompression failure.
        reason: String,
    },

    /// A read would run past the end of the current buffer.
    #[error("Unexpected end of data: expected {expected} bytes, but only {available} available")]
    UnexpectedEof {
        /// The buffer length that would have been needed.
        expected: usize,
        /// The actual buffer length.
        available: usize,
    },

    /// A command byte carried an opcode outside the recognised set.
    #[error("Unknown opcode 0x{opcode:02X} at offset {offset}")]
    UnknownOpcode {
        /// The low 5 bits of the command byte.
        opcode: u8,
        /// Offset of the command byte within its block.
        offset: usize,
    },

    /// A standalone config-string command referenced an index outside the table.
    #[error("Config-string index {index} is out of range")]
    InvalidConfigString {
        /// The offending index.
        index: u16,
    },
}

impl ParserError {
    /// Creates an `InvalidMagic` error with the given byte slices.
    ///
    /// The bytes are converted to hex strings for human-readable display.
    ///
    /// # Example
    ///
    /// ```
    /// use mvd2_parser::error::ParserError;
    ///
    /// let err = ParserError::invalid_magic(b"MVD2", b"\x00\x00\x00\x00");
    /// assert!(err.to_string().contains("Invalid magic bytes"));
    /// ```
    #[must_use]
    pub fn invalid_magic(expected: &[u8], found: &[u8]) -> Self {
        ParserError::InvalidMagic {
            expected: bytes_to_hex(expected),
            found: bytes_to_hex(found),
        }
    }

    /// Creates an `UnexpectedEof` error with the given sizes.
    #[must_use]
    pub fn unexpected_eof(expected: usize, available: usize) -> Self {
        ParserError::UnexpectedEof { expected, available }
    }

    /// Returns `true` for errors that must abort the whole parse.
    ///
    /// Everything else is confined to the block in which it happened.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ParserError::IoError(_)
                | ParserError::InvalidMagic { .. }
                | ParserError::DecompressionError { .. }
        )
    }
}

/// Converts a byte slice to a hexadecimal string representation.
///
/// If the slice is 8 bytes or less, formats as space-separated hex values.
/// If longer, shows the first 8 bytes followed by "...".
fn bytes_to_hex(bytes: &[u8]) -> String {
    let shown = &bytes[..bytes.len().min(8)];
    let prefix = shown
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ");

    if bytes.len() <= 8 {
        prefix
    } else {
        format!("{prefix}... ({} bytes total)", bytes.len())
    }
}

/// A specialized Result type for MVD2 parsing operations.
pub type Result<T> = std::result::Result<T, ParserError>;
