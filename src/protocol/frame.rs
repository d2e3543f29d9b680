//! Frame decoding.
//!
//! A frame is:
//!
//! 1. a length-prefixed portal-bits blob (ignored),
//! 2. the player-state delta list (see [`super::player`]),
//! 3. the entity delta list (see [`super::entity`]).
//!
//! The snapshot is built from the persistent state table after the player
//! list has been applied, so clients that were not touched in this frame
//! still appear at their last known position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entity::skip_entities;
use super::player::{PlayerPosition, PlayerStateTable};
use crate::binary::ByteCursor;
use crate::error::{ParserError, Result};

/// Positions of every tracked client in one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Zero-based frame index.
    pub t: usize,

    /// Client number → position.
    pub players: BTreeMap<u8, PlayerPosition>,
}

/// A decoded frame plus any error hit while skipping its entity list.
///
/// The snapshot is complete once the player list has been read, so an
/// entity-list failure does not discard it; the caller decides what to do
/// with the rest of the block.
#[derive(Debug)]
pub struct DecodedFrame {
    /// The snapshot.
    pub frame: Frame,

    /// Error raised while skipping entity deltas, if any.
    pub entity_error: Option<ParserError>,
}

/// Decodes one frame and applies its player deltas to `states`.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the portal bits or the player
/// list are truncated. Player deltas read before the error stay applied.
pub fn decode_frame(
    cursor: &mut ByteCursor<'_>,
    states: &mut PlayerStateTable,
    index: usize,
) -> Result<DecodedFrame> {
    cursor.read_blob()?;
    states.read_deltas(cursor)?;

    let frame = Frame {
        t: index,
        players: states.snapshot(),
    };
    let entity_error = skip_entities(cursor).err();

    Ok(DecodedFrame { frame, entity_error })
}
