//! Block framing for decompressed MVD2 captures.
//!
//! After the 4-byte magic, a capture is a sequence of blocks:
//!
//! | Size | Type | Field |
//! |------|------|-------|
//! | 2 | u16 LE | Block length (0 = end of capture) |
//! | var | bytes | Command stream |
//!
//! A length that would run past the end of the buffer means the capture
//! was cut short. That ends iteration normally; it is not an error.
//!
//! # Example
//!
//! ```
//! use mvd2_parser::blocks::BlockIterator;
//!
//! let data = b"MVD2\x02\x00\x01\x01\x01\x00\x01\x00\x00";
//! let blocks: Vec<_> = BlockIterator::new(data).collect();
//!
//! assert_eq!(blocks.len(), 2);
//! assert_eq!(blocks[0].payload, &[0x01, 0x01]);
//! assert_eq!(blocks[1].payload, &[0x01]);
//! ```

use crate::format::MVD_MAGIC;

/// Size of the block length prefix in bytes.
pub const BLOCK_HEADER_SIZE: usize = 2;

/// One length-prefixed block of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block<'a> {
    /// Zero-based block index.
    pub index: usize,

    /// Offset of the payload within the capture.
    pub offset: usize,

    /// The command stream of this block.
    pub payload: &'a [u8],
}

/// Why block iteration stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// A zero-length block terminated the capture.
    Terminator,
    /// The buffer ran out exactly at a block boundary.
    EndOfBuffer,
    /// A block header or payload ran past the end of the buffer.
    Truncated {
        /// Offset of the incomplete block header.
        offset: usize,
    },
}

/// Iterator over the blocks of a capture that starts with `MVD2`.
///
/// The magic tag itself is not checked here; see
/// [`crate::decompress::unwrap_container`].
#[derive(Debug, Clone)]
pub struct BlockIterator<'a> {
    data: &'a [u8],
    offset: usize,
    index: usize,
    end: Option<StreamEnd>,
}

impl<'a> BlockIterator<'a> {
    /// Creates an iterator positioned just after the magic tag.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: MVD_MAGIC.len().min(data.len()),
            index: 0,
            end: None,
        }
    }

    /// Returns why iteration stopped, once it has.
    #[must_use]
    pub fn stream_end(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Returns the current byte offset in the capture.
    #[must_use]
    pub fn current_offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of blocks yielded so far.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.index
    }

    fn finish(&mut self, end: StreamEnd) -> Option<Block<'a>> {
        self.end = Some(end);
        None
    }
}

impl<'a> Iterator for BlockIterator<'a> {
    type Item = Block<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }

        let remaining = self.data.len() - self.offset;
        if remaining == 0 {
            return self.finish(StreamEnd::EndOfBuffer);
        }
        if remaining < BLOCK_HEADER_SIZE {
            return self.finish(StreamEnd::Truncated { offset: self.offset });
        }

        let header = [self.data[self.offset], self.data[self.offset + 1]];
        let length = usize::from(u16::from_le_bytes(header));
        if length == 0 {
            return self.finish(StreamEnd::Terminator);
        }

        let start = self.offset + BLOCK_HEADER_SIZE;
        let end = start + length;
        if end > self.data.len() {
            return self.finish(StreamEnd::Truncated { offset: self.offset });
        }

        let block = Block {
            index: self.index,
            offset: start,
            payload: &self.data[start..end],
        };
        self.offset = end;
        self.index += 1;
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(blocks: &[&[u8]]) -> Vec<u8> {
        let mut data = MVD_MAGIC.to_vec();
        for block in blocks {
            data.extend_from_slice(&(block.len() as u16).to_le_bytes());
            data.extend_from_slice(block);
        }
        data
    }

    #[test]
    fn test_blocks_until_terminator() {
        let mut data = capture(&[&[0x01], &[0x01, 0x01, 0x01]]);
        data.extend_from_slice(&[0x00, 0x00]);
        data.extend_from_slice(&[0x01, 0x00, 0x01]); // never reached

        let mut iter = BlockIterator::new(&data);
        let blocks: Vec<_> = iter.by_ref().collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[0].offset, 6);
        assert_eq!(blocks[1].payload.len(), 3);
        assert_eq!(iter.stream_end(), Some(StreamEnd::Terminator));
        assert_eq!(iter.block_count(), 2);
    }

    #[test]
    fn test_blocks_end_of_buffer() {
        let data = capture(&[&[0x01]]);
        let mut iter = BlockIterator::new(&data);
        assert_eq!(iter.by_ref().count(), 1);
        assert_eq!(iter.stream_end(), Some(StreamEnd::EndOfBuffer));
    }

    #[test]
    fn test_blocks_truncated_payload() {
        let mut data = capture(&[&[0x01]]);
        data.extend_from_slice(&[0x10, 0x00, 0x01, 0x01]); // claims 16 bytes

        let mut iter = BlockIterator::new(&data);
        assert_eq!(iter.by_ref().count(), 1);
        assert_eq!(iter.stream_end(), Some(StreamEnd::Truncated { offset: 7 }));
    }

    #[test]
    fn test_blocks_truncated_header() {
        let mut data = capture(&[]);
        data.push(0x05);

        let mut iter = BlockIterator::new(&data);
        assert!(iter.next().is_none());
        assert_eq!(iter.stream_end(), Some(StreamEnd::Truncated { offset: 4 }));
        assert!(iter.next().is_none());
    }
}
