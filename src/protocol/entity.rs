//! Entity delta skipping.
//!
//! Entity deltas follow the player list in every frame. Nothing in them is
//! needed for the timeline, but their length depends on a chained bitmask,
//! so each one has to be walked field by field to find where the next
//! command begins.
//!
//! The mask is read one byte at a time: bit 7 of the first byte announces a
//! second byte (bits 8..16), bit 15 a third (bits 16..24) and bit 23 a
//! fourth (bits 24..32).

use crate::binary::ByteCursor;
use crate::error::Result;

/// Entity delta bits.
pub mod bits {
    /// Origin x.
    pub const E_ORIGIN1: u32 = 1 << 0;
    /// Origin y.
    pub const E_ORIGIN2: u32 = 1 << 1;
    /// Angle yaw.
    pub const E_ANGLE2: u32 = 1 << 2;
    /// Angle roll.
    pub const E_ANGLE3: u32 = 1 << 3;
    /// 8-bit animation frame.
    pub const E_FRAME8: u32 = 1 << 4;
    /// Event byte.
    pub const E_EVENT: u32 = 1 << 5;
    /// Entity left the view.
    pub const E_REMOVE: u32 = 1 << 6;
    /// Second mask byte follows.
    pub const E_MOREBITS1: u32 = 1 << 7;
    /// Entity number is 16 bits wide.
    pub const E_NUMBER16: u32 = 1 << 8;
    /// Origin z.
    pub const E_ORIGIN3: u32 = 1 << 9;
    /// Angle pitch.
    pub const E_ANGLE1: u32 = 1 << 10;
    /// Primary model index.
    pub const E_MODEL: u32 = 1 << 11;
    /// 8-bit render flags.
    pub const E_RENDERFX8: u32 = 1 << 12;
    /// 8-bit effects.
    pub const E_EFFECTS8: u32 = 1 << 14;
    /// Third mask byte follows.
    pub const E_MOREBITS2: u32 = 1 << 15;
    /// 8-bit skin.
    pub const E_SKIN8: u32 = 1 << 16;
    /// 16-bit animation frame.
    pub const E_FRAME16: u32 = 1 << 17;
    /// 16-bit render flags.
    pub const E_RENDERFX16: u32 = 1 << 18;
    /// 16-bit effects.
    pub const E_EFFECTS16: u32 = 1 << 19;
    /// Second model index.
    pub const E_MODEL2: u32 = 1 << 20;
    /// Third model index.
    pub const E_MODEL3: u32 = 1 << 21;
    /// Fourth model index.
    pub const E_MODEL4: u32 = 1 << 22;
    /// Fourth mask byte follows.
    pub const E_MOREBITS3: u32 = 1 << 23;
    /// Previous origin.
    pub const E_OLDORIGIN: u32 = 1 << 24;
    /// 16-bit skin.
    pub const E_SKIN16: u32 = 1 << 25;
    /// Looping sound.
    pub const E_SOUND: u32 = 1 << 26;
    /// Solid bounding box.
    pub const E_SOLID: u32 = 1 << 27;

    /// Both frame bits.
    pub const E_FRAME32: u32 = E_FRAME8 | E_FRAME16;
    /// Both skin bits: 32-bit skin.
    pub const E_SKIN32: u32 = E_SKIN8 | E_SKIN16;
    /// Both effects bits: 32-bit effects.
    pub const E_EFFECTS32: u32 = E_EFFECTS8 | E_EFFECTS16;
    /// Both render-flag bits: 32-bit render flags.
    pub const E_RENDERFX32: u32 = E_RENDERFX8 | E_RENDERFX16;
}

use bits::*;

/// Reads the chained entity bitmask.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if a continuation byte is missing.
pub fn read_entity_bits(cursor: &mut ByteCursor<'_>) -> Result<u32> {
    let mut mask = u32::from(cursor.read_u8()?);
    for (flag, shift) in [(E_MOREBITS1, 8), (E_MOREBITS2, 16), (E_MOREBITS3, 24)] {
        if mask & flag == 0 {
            break;
        }
        mask |= u32::from(cursor.read_u8()?) << shift;
    }
    Ok(mask)
}

/// Skips a field whose width is picked by a pair of bits.
///
/// Both bits set means a 32-bit value, one bit alone means 8 or 16 bits.
fn skip_variable(
    cursor: &mut ByteCursor<'_>,
    mask: u32,
    bits8: u32,
    bits16: u32,
    both: usize,
) -> Result<()> {
    match (mask & bits8 != 0, mask & bits16 != 0) {
        (true, true) => cursor.skip(both),
        (false, true) => cursor.skip(2),
        (true, false) => cursor.skip(1),
        (false, false) => Ok(()),
    }
}

/// Consumes one entity delta.
///
/// Returns `false` at the end-of-list marker (entity number 0).
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the delta is truncated.
pub fn skip_entity(cursor: &mut ByteCursor<'_>) -> Result<bool> {
    let mask = read_entity_bits(cursor)?;

    let number = if mask & E_NUMBER16 != 0 {
        cursor.read_u16()?
    } else {
        u16::from(cursor.read_u8()?)
    };
    if number == 0 {
        return Ok(false);
    }
    if mask & E_REMOVE != 0 {
        return Ok(true);
    }

    for model in [E_MODEL, E_MODEL2, E_MODEL3, E_MODEL4] {
        if mask & model != 0 {
            cursor.skip(1)?;
        }
    }

    // both frame bits together carry no payload
    skip_variable(cursor, mask, E_FRAME8, E_FRAME16, 0)?;
    skip_variable(cursor, mask, E_SKIN8, E_SKIN16, 4)?;
    skip_variable(cursor, mask, E_EFFECTS8, E_EFFECTS16, 4)?;
    skip_variable(cursor, mask, E_RENDERFX8, E_RENDERFX16, 4)?;

    for origin in [E_ORIGIN1, E_ORIGIN2, E_ORIGIN3] {
        if mask & origin != 0 {
            cursor.skip(2)?;
        }
    }
    for angle in [E_ANGLE1, E_ANGLE2, E_ANGLE3] {
        if mask & angle != 0 {
            cursor.skip(1)?;
        }
    }
    if mask & E_OLDORIGIN != 0 {
        cursor.skip(6)?;
    }
    if mask & E_SOUND != 0 {
        cursor.skip(1)?;
    }
    if mask & E_EVENT != 0 {
        cursor.skip(1)?;
    }
    if mask & E_SOLID != 0 {
        cursor.skip(2)?;
    }

    Ok(true)
}

/// Consumes entity deltas up to and including the end-of-list marker.
///
/// # Errors
///
/// Returns `ParserError::UnexpectedEof` if the list is truncated.
pub fn skip_entities(cursor: &mut ByteCursor<'_>) -> Result<usize> {
    let mut count = 0;
    while skip_entity(cursor)? {
        count += 1;
    }
    Ok(count)
}
