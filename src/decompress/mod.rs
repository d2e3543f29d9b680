//! Container unwrapping for MVD2 captures.
//!
//! A capture is either stored raw (starting with `MVD2`) or wrapped in
//! gzip. [`unwrap_container`] detects which, inflates if needed, and checks
//! the magic tag of the result.
//!
//! ```
//! use mvd2_parser::decompress::unwrap_container;
//!
//! let data = unwrap_container(b"MVD2\x00\x00").unwrap();
//! assert_eq!(&data[..4], b"MVD2");
//!
//! assert!(unwrap_container(b"DEMO").is_err());
//! ```

pub mod gzip;

pub use gzip::{decompress_gzip, GZIP_CHUNK_SIZE};

use std::borrow::Cow;

use tracing::debug;

use crate::error::{ParserError, Result};
use crate::format::{detect_container, ContainerFormat, MVD_MAGIC};

/// Returns the decompressed capture, verified to start with `MVD2`.
///
/// Raw input is borrowed; gzip input is inflated into an owned buffer.
///
/// # Errors
///
/// - `ParserError::DecompressionError` if a gzip container yields no bytes
/// - `ParserError::InvalidMagic` if the data does not start with `MVD2`
pub fn unwrap_container(data: &[u8]) -> Result<Cow<'_, [u8]>> {
    let data = match detect_container(data) {
        ContainerFormat::Gzip => {
            let inflated = decompress_gzip(data)?;
            debug!(
                compressed = data.len(),
                decompressed = inflated.len(),
                "inflated gzip container"
            );
            Cow::Owned(inflated)
        }
        ContainerFormat::Raw => Cow::Borrowed(data),
    };

    if !data.starts_with(MVD_MAGIC) {
        let found = &data[..data.len().min(MVD_MAGIC.len())];
        return Err(ParserError::invalid_magic(MVD_MAGIC, found));
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_unwrap_raw_is_borrowed() {
        let data = b"MVD2\x00\x00";
        let out = unwrap_container(data).unwrap();
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_unwrap_gzip() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"MVD2\x00\x00").unwrap();
        let archive = encoder.finish().unwrap();

        let out = unwrap_container(&archive).unwrap();
        assert_eq!(&*out, b"MVD2\x00\x00");
    }

    #[test]
    fn test_unwrap_wrong_magic() {
        let result = unwrap_container(b"MVD1\x00\x00");
        match result {
            Err(ParserError::InvalidMagic { expected, found }) => {
                assert_eq!(expected, "4D 56 44 32");
                assert_eq!(found, "4D 56 44 31");
            }
            other => panic!("Expected InvalidMagic, got {other:?}"),
        }
    }

    #[test]
    fn test_unwrap_short_input() {
        assert!(matches!(
            unwrap_container(b"MV"),
            Err(ParserError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_unwrap_gzip_wrong_magic() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"not a capture").unwrap();
        let archive = encoder.finish().unwrap();

        assert!(matches!(
            unwrap_container(&archive),
            Err(ParserError::InvalidMagic { .. })
        ));
    }
}
