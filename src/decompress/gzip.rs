//! Gzip unwrapping for compressed MVD2 captures.
//!
//! Captures are often stored as `.mvd2.gz`, and partially downloaded or
//! interrupted recordings leave truncated archives behind. The decoder here
//! reads the archive in fixed-size chunks and keeps every byte it managed
//! to inflate before an error, so a damaged archive still yields a usable
//! prefix. Only an archive that inflates to nothing is an error.
//!
//! # Example
//!
//! ```
//! use std::io::Write;
//! use flate2::write::GzEncoder;
//! use flate2::Compression;
//! use mvd2_parser::decompress::gzip::decompress_gzip;
//!
//! let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
//! encoder.write_all(b"MVD2\x00\x00").unwrap();
//! let archive = encoder.finish().unwrap();
//!
//! assert_eq!(decompress_gzip(&archive).unwrap(), b"MVD2\x00\x00");
//! ```

use std::io::Read;

use flate2::read::MultiGzDecoder;
use tracing::warn;

use crate::error::{ParserError, Result};

/// Number of bytes requested from the decoder per read.
pub const GZIP_CHUNK_SIZE: usize = 64 * 1024;

/// Inflates a gzip archive, tolerating truncation.
///
/// Concatenated gzip members are inflated back to back.
///
/// # Errors
///
/// Returns `ParserError::DecompressionError` if the archive produced zero
/// bytes, whether because it is empty, corrupt from the first byte, or
/// truncated inside its header.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = MultiGzDecoder::new(data);
    let mut output = Vec::with_capacity(data.len() * 4);
    let mut chunk = vec![0u8; GZIP_CHUNK_SIZE];

    loop {
        match decoder.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => output.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if output.is_empty() {
                    return Err(ParserError::DecompressionError {
                        reason: format!("gzip archive is empty or corrupt: {e}"),
                    });
                }
                warn!(
                    recovered = output.len(),
                    error = %e,
                    "gzip archive is truncated, keeping the decompressed prefix"
                );
                break;
            }
        }
    }

    if output.is_empty() {
        return Err(ParserError::DecompressionError {
            reason: "gzip archive decompressed to zero bytes".to_string(),
        });
    }

    Ok(output)
}
